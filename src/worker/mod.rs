//! Background Worker
//!
//! A single actor owning the versioned response cache. Every lifecycle,
//! push, click and fetch event is a [`WorkerMessage`] answered through a
//! oneshot only once its work is done. Revalidation fetches run in a
//! `JoinSet` that is drained before the actor exits.

use std::{future::Future, sync::Arc};

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinHandle, JoinSet},
};
use url::Url;

use crate::types::DEFAULT_LINK;

mod cache;
mod fetch;
mod notification;

pub use self::{
    cache::CacheStorage,
    fetch::{fetch_and_cache, is_cacheable, FetchOutcome},
    notification::{matches_target, notification_from_push, ClickAction},
};

const CHANNEL_SIZE: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Worker is not running")]
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: String::from("GET"),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            headers: vec![],
            body: body.into(),
        }
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Served when neither the network nor the offline page is available.
    pub fn offline() -> Self {
        Response::new(503, "<h1>Offline</h1><p>No connection.</p>")
            .with_header("content-type", "text/html; charset=utf-8")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Target opened on click.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: String,
    pub cache_prefix: String,
    pub version: String,
    pub precache: Vec<String>,
    pub offline_page: String,
    pub default_title: String,
    pub default_body: String,
    pub icon: String,
    pub badge: String,
}

impl WorkerConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        WorkerConfig {
            origin: origin.into(),
            cache_prefix: String::from("cat-spray"),
            version: String::from(env!("CARGO_PKG_VERSION")),
            precache: vec![
                String::from(DEFAULT_LINK),
                String::from("/offline.html"),
                String::from("/manifest.json"),
                String::from("/android-chrome-192x192.png"),
            ],
            offline_page: String::from("/offline.html"),
            default_title: String::from("New notification"),
            default_body: String::from("There are new updates!"),
            icon: String::from("/android-chrome-192x192.png"),
            badge: String::from("/favicon-32x32.png"),
        }
    }

    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Absolute URL for `path`, relative to the worker's origin.
    pub fn resolve(&self, path: &str) -> String {
        match Url::parse(&self.origin).and_then(|origin| origin.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => path.to_owned(),
        }
    }
}

/// What the browser provides to the worker.
pub trait WorkerHost: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, WorkerError>> + Send;

    fn show_notification(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;

    fn close_notification(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = ()> + Send;

    fn window_clients(&self) -> impl Future<Output = Vec<WindowClient>> + Send;

    fn focus(
        &self,
        client_id: &str,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;

    fn open_window(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;

    fn skip_waiting(&self) -> impl Future<Output = ()> + Send;

    fn claim_clients(&self) -> impl Future<Output = ()> + Send;
}

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub enum WorkerMessage {
    Install(Reply<Result<(), WorkerError>>),
    /// Replies with the names of the deleted caches.
    Activate(Reply<Vec<String>>),
    SkipWaiting(Reply<()>),
    Push {
        data: Option<Vec<u8>>,
        reply: Reply<Result<Notification, WorkerError>>,
    },
    NotificationClick {
        notification: Notification,
        reply: Reply<Result<ClickAction, WorkerError>>,
    },
    Fetch {
        request: Request,
        reply: Reply<FetchOutcome>,
    },
    Shutdown(Reply<()>),
}

#[derive(Debug, Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    async fn call<T>(
        &self,
        message: impl FnOnce(Reply<T>) -> WorkerMessage,
    ) -> Result<T, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(message(reply))
            .await
            .map_err(|_| WorkerError::Closed)?;
        response.await.map_err(|_| WorkerError::Closed)
    }

    pub async fn install(&self) -> Result<(), WorkerError> {
        self.call(WorkerMessage::Install).await?
    }

    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        self.call(WorkerMessage::Activate).await
    }

    pub async fn skip_waiting(&self) -> Result<(), WorkerError> {
        self.call(WorkerMessage::SkipWaiting).await
    }

    pub async fn push(
        &self,
        data: Option<Vec<u8>>,
    ) -> Result<Notification, WorkerError> {
        self.call(|reply| WorkerMessage::Push { data, reply }).await?
    }

    pub async fn notification_click(
        &self,
        notification: Notification,
    ) -> Result<ClickAction, WorkerError> {
        self.call(|reply| WorkerMessage::NotificationClick {
            notification,
            reply,
        })
        .await?
    }

    pub async fn fetch(
        &self,
        request: Request,
    ) -> Result<FetchOutcome, WorkerError> {
        self.call(|reply| WorkerMessage::Fetch { request, reply }).await
    }

    /// Waits for pending background work, then stops the worker.
    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.call(WorkerMessage::Shutdown).await
    }
}

pub struct ServiceWorker<H> {
    config: Arc<WorkerConfig>,
    host: Arc<H>,
    caches: CacheStorage,
    background: JoinSet<()>,
    receiver: mpsc::Receiver<WorkerMessage>,
}

impl<H: WorkerHost> ServiceWorker<H> {
    /// `caches` outlives any one worker version, like the browser's
    /// per-origin cache storage.
    pub fn spawn(
        config: WorkerConfig,
        host: Arc<H>,
        caches: CacheStorage,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_SIZE);
        let worker = ServiceWorker {
            config: Arc::new(config),
            host,
            caches,
            background: JoinSet::new(),
            receiver,
        };

        let task = tokio::spawn(worker.run());

        (WorkerHandle { sender }, task)
    }

    async fn run(mut self) {
        tracing::info!("Worker {} started", self.config.cache_name());

        while let Some(message) = self.receiver.recv().await {
            while self.background.try_join_next().is_some() {}

            match message {
                WorkerMessage::Install(reply) => {
                    let _ = reply.send(self.install().await);
                },
                WorkerMessage::Activate(reply) => {
                    let _ = reply.send(self.activate().await);
                },
                WorkerMessage::SkipWaiting(reply) => {
                    self.host.skip_waiting().await;
                    let _ = reply.send(());
                },
                WorkerMessage::Push { data, reply } => {
                    let _ = reply.send(self.push(data).await);
                },
                WorkerMessage::NotificationClick {
                    notification,
                    reply,
                } => {
                    let _ = reply.send(self.click(notification).await);
                },
                WorkerMessage::Fetch { request, reply } => {
                    let _ = reply.send(self.fetch(request).await);
                },
                WorkerMessage::Shutdown(reply) => {
                    self.drain().await;
                    let _ = reply.send(());
                    return;
                },
            }
        }

        self.drain().await;
    }

    async fn drain(&mut self) {
        while let Some(result) = self.background.join_next().await {
            if let Err(e) = result {
                tracing::error!("Background task failed: {}", e);
            }
        }
        tracing::info!("Worker {} stopped", self.config.cache_name());
    }

    /// Precaches every asset or none, then activates without waiting for
    /// old clients.
    async fn install(&mut self) -> Result<(), WorkerError> {
        let name = self.config.cache_name();
        let mut staged = Vec::with_capacity(self.config.precache.len());

        for asset in &self.config.precache {
            let url = self.config.resolve(asset);
            let response = self.host.fetch(&Request::get(&url)).await?;
            if !(200..300).contains(&response.status) {
                return Err(WorkerError::Network(format!(
                    "precache {} answered {}",
                    url, response.status
                )));
            }
            staged.push((url, response));
        }

        self.caches.put_all(&name, staged);

        tracing::info!("Installed cache {}", name);
        self.host.skip_waiting().await;

        Ok(())
    }

    async fn activate(&mut self) -> Vec<String> {
        let current = self.config.cache_name();
        let stale = self.caches.delete_except(&current);

        for name in &stale {
            tracing::info!("Deleted stale cache {}", name);
        }
        self.host.claim_clients().await;

        stale
    }

    async fn push(
        &mut self,
        data: Option<Vec<u8>>,
    ) -> Result<Notification, WorkerError> {
        let notification = notification_from_push(data.as_deref(), &self.config);
        self.host.show_notification(&notification).await?;

        Ok(notification)
    }

    async fn click(
        &mut self,
        notification: Notification,
    ) -> Result<ClickAction, WorkerError> {
        self.host.close_notification(&notification).await;

        let target = notification.data;
        let clients = self.host.window_clients().await;

        if let Some(client) =
            clients.iter().find(|c| matches_target(&c.url, &target))
        {
            match self.host.focus(&client.id).await {
                Ok(()) => return Ok(ClickAction::Focused(client.id.to_owned())),
                Err(e) => {
                    tracing::warn!("Could not focus {}: {}", client.id, e);
                },
            }
        }

        self.host.open_window(&target).await?;
        Ok(ClickAction::Opened(target))
    }

    async fn fetch(&mut self, mut request: Request) -> FetchOutcome {
        if !request.method.eq_ignore_ascii_case("GET") {
            return FetchOutcome::Passthrough;
        }

        request.url = self.config.resolve(&request.url);
        let name = self.config.cache_name();

        if let Some(response) = self.caches.match_url(&request.url) {
            let host = Arc::clone(&self.host);
            let caches = self.caches.clone();
            self.background.spawn(async move {
                if let Err(e) =
                    fetch_and_cache(host.as_ref(), &caches, &name, &request).await
                {
                    tracing::debug!("Revalidation of {} failed: {}", request.url, e);
                }
            });
            return FetchOutcome::Respond(response);
        }

        match fetch_and_cache(self.host.as_ref(), &self.caches, &name, &request)
            .await
        {
            Ok(response) => FetchOutcome::Respond(response),
            Err(e) => {
                tracing::warn!("Serving offline page for {}: {}", request.url, e);
                let offline_url = self.config.resolve(&self.config.offline_page);
                let offline = self.caches.match_url(&offline_url);
                FetchOutcome::Respond(offline.unwrap_or_else(Response::offline))
            },
        }
    }
}
