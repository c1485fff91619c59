use serde::{Deserialize, Serialize};

use crate::{
    client::{
        api::decode_application_server_key,
        support::{check_support, Capabilities, PermissionState, SupportState},
        ClientError,
    },
    types::{Platform, SubscriptionKeys, SubscriptionRequest},
};

pub const WORKER_SCRIPT: &str = "/sw.js";

/// `PushSubscription.toJSON()` as handed out by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserSubscription {
    pub endpoint: String,
    #[serde(rename = "expirationTime", default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

impl BrowserSubscription {
    pub fn to_request(
        &self,
        user_id: Option<&str>,
        platform: Platform,
    ) -> SubscriptionRequest {
        SubscriptionRequest {
            endpoint: self.endpoint.to_owned(),
            expiration_time: self.expiration_time,
            keys: self.keys.clone(),
            user_id: user_id.map(str::to_owned),
            platform: Some(platform),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

/// Worker registration, notification permission and the push manager.
#[allow(async_fn_in_trait)]
pub trait PushRuntime {
    fn capabilities(&self) -> Capabilities;

    fn permission(&self) -> PermissionState;

    async fn request_permission(&self) -> Result<PermissionState, ClientError>;

    async fn has_registration(&self) -> Result<bool, ClientError>;

    async fn register_worker(&self, script: &str) -> Result<(), ClientError>;

    async fn get_subscription(
        &self,
    ) -> Result<Option<BrowserSubscription>, ClientError>;

    async fn subscribe(
        &self,
        options: &SubscribeOptions,
    ) -> Result<BrowserSubscription, ClientError>;

    async fn unsubscribe(
        &self,
        subscription: &BrowserSubscription,
    ) -> Result<(), ClientError>;
}

/// Server endpoints the client talks to.
#[allow(async_fn_in_trait)]
pub trait SubscriptionApi {
    async fn vapid_public_key(&self) -> Result<String, ClientError>;

    async fn save(&self, request: &SubscriptionRequest)
        -> Result<(), ClientError>;

    async fn delete(&self, endpoint: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientState {
    Unknown,
    /// Terminal for this session.
    Unsupported,
    /// Supported, not subscribed.
    Ready,
    Subscribing,
    Subscribed,
    PermissionDenied,
    /// Recoverable, the caller may retry.
    Error(String),
}

pub struct PushClient<R, A> {
    runtime: R,
    api: A,
    state: ClientState,
    support: Option<SupportState>,
    subscription: Option<BrowserSubscription>,
    vapid_public_key: Option<String>,
}

impl<R, A> PushClient<R, A>
where
    R: PushRuntime,
    A: SubscriptionApi,
{
    pub fn new(runtime: R, api: A) -> Self {
        PushClient {
            runtime,
            api,
            state: ClientState::Unknown,
            support: None,
            subscription: None,
            vapid_public_key: None,
        }
    }

    /// Skips the key lookup on the server.
    pub fn with_vapid_public_key(mut self, key: impl Into<String>) -> Self {
        self.vapid_public_key = Some(key.into());
        self
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn support(&self) -> Option<&SupportState> {
        self.support.as_ref()
    }

    pub fn subscription(&self) -> Option<&BrowserSubscription> {
        self.subscription.as_ref()
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub async fn check_support(&mut self) -> SupportState {
        let capabilities = self.runtime.capabilities();
        let permission = self.runtime.permission();
        let mut support = check_support(&capabilities, permission, false);

        if !support.is_supported {
            self.state = ClientState::Unsupported;
            self.support = Some(support.clone());
            return support;
        }

        match self.current_subscription().await {
            Ok(current) => {
                support.is_subscribed = current.is_some();
                self.subscription = current;
            },
            Err(e) => {
                tracing::warn!("Could not read push subscription: {}", e);
                support.error = Some(e.to_string());
            },
        }

        self.state = if permission == PermissionState::Denied {
            ClientState::PermissionDenied
        } else if support.is_subscribed {
            ClientState::Subscribed
        } else {
            ClientState::Ready
        };
        self.support = Some(support.clone());

        support
    }

    /// Replaces any local subscription with a fresh one and stores it on
    /// the server. One server upsert per successful call.
    pub async fn subscribe(
        &mut self,
        user_id: Option<&str>,
    ) -> Result<BrowserSubscription, ClientError> {
        let support = match &self.support {
            Some(support) => support.clone(),
            None => self.check_support().await,
        };

        if !support.is_supported {
            self.state = ClientState::Unsupported;
            return Err(ClientError::Unsupported(
                support.error.unwrap_or_default(),
            ));
        }

        self.state = ClientState::Subscribing;

        match self.create_subscription(user_id, support.platform).await {
            Ok(subscription) => {
                self.state = ClientState::Subscribed;
                self.subscription = Some(subscription.clone());
                if let Some(support) = self.support.as_mut() {
                    support.is_subscribed = true;
                    support.permission_state = PermissionState::Granted;
                    support.error = None;
                }
                Ok(subscription)
            },
            Err(ClientError::PermissionDenied) => {
                self.state = ClientState::PermissionDenied;
                self.record_error(&ClientError::PermissionDenied);
                Err(ClientError::PermissionDenied)
            },
            Err(e) => {
                self.state = ClientState::Error(e.to_string());
                self.record_error(&e);
                Err(e)
            },
        }
    }

    /// The server delete must succeed before the local subscription is
    /// dropped; on failure the subscription stays active.
    pub async fn unsubscribe(&mut self) -> Result<(), ClientError> {
        let subscription = match &self.subscription {
            Some(subscription) => subscription.clone(),
            None => return Err(ClientError::NoActiveSubscription),
        };

        if let Err(e) = self.api.delete(&subscription.endpoint).await {
            tracing::warn!("Server refused unsubscribe: {}", e);
            self.record_error(&e);
            return Err(e);
        }

        if let Err(e) = self.runtime.unsubscribe(&subscription).await {
            self.state = ClientState::Error(e.to_string());
            self.record_error(&e);
            return Err(e);
        }

        self.subscription = None;
        self.state = ClientState::Ready;
        if let Some(support) = self.support.as_mut() {
            support.is_subscribed = false;
            support.error = None;
        }

        Ok(())
    }

    async fn create_subscription(
        &mut self,
        user_id: Option<&str>,
        platform: Platform,
    ) -> Result<BrowserSubscription, ClientError> {
        if self.runtime.permission() != PermissionState::Granted
            && self.runtime.request_permission().await?
                != PermissionState::Granted
        {
            return Err(ClientError::PermissionDenied);
        }

        self.ensure_registration().await?;

        if let Some(existing) = self.runtime.get_subscription().await? {
            tracing::debug!("Dropping previous subscription {}", existing.endpoint);
            // Best effort, push services report leftovers as gone later.
            if let Err(e) = self.api.delete(&existing.endpoint).await {
                tracing::warn!(
                    "Could not remove {} from the server: {}",
                    existing.endpoint,
                    e
                );
            }
            self.runtime.unsubscribe(&existing).await?;
        }

        let key = match &self.vapid_public_key {
            Some(key) => key.to_owned(),
            None => self.api.vapid_public_key().await?,
        };
        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: decode_application_server_key(&key)?,
        };
        self.vapid_public_key = Some(key);

        let subscription = self.runtime.subscribe(&options).await?;
        self.api.save(&subscription.to_request(user_id, platform)).await?;

        Ok(subscription)
    }

    async fn current_subscription(
        &self,
    ) -> Result<Option<BrowserSubscription>, ClientError> {
        self.ensure_registration().await?;
        self.runtime.get_subscription().await
    }

    async fn ensure_registration(&self) -> Result<(), ClientError> {
        if !self.runtime.has_registration().await? {
            tracing::debug!("Registering {}", WORKER_SCRIPT);
            self.runtime.register_worker(WORKER_SCRIPT).await?;
        }
        Ok(())
    }

    fn record_error(&mut self, err: &ClientError) {
        if let Some(support) = self.support.as_mut() {
            support.error = Some(err.to_string());
        }
    }
}
