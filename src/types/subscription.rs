use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, io, str::FromStr};
use url::Url;

use crate::{error::Error, model};

/// Uncompressed P-256 point.
const P256DH_LEN: usize = 65;
const AUTH_LEN: usize = 16;

/// Body of `POST /push-subscription`, the browser's `PushSubscription.toJSON()`
/// plus the owner metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub endpoint: String,
    #[serde(rename = "expirationTime", default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveSubscriptionRequest {
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl SubscriptionRequest {
    pub fn validate(&self) -> Result<(), Error> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::MissingField("endpoint"));
        }

        let url = Url::parse(&self.endpoint).map_err(|e| {
            Error::InvalidSubscription(format!("endpoint is not a URL: {}", e))
        })?;

        if url.scheme() != "https" {
            return Err(Error::InvalidSubscription(String::from(
                "endpoint must use https",
            )));
        }

        if self.keys.p256dh.trim().is_empty() {
            return Err(Error::MissingField("keys.p256dh"));
        }

        if self.keys.auth.trim().is_empty() {
            return Err(Error::MissingField("keys.auth"));
        }

        let p256dh = decode_key("p256dh", &self.keys.p256dh)?;
        if p256dh.len() != P256DH_LEN || p256dh[0] != 0x04 {
            return Err(Error::InvalidSubscription(String::from(
                "keys.p256dh is not an uncompressed P-256 public key",
            )));
        }

        if decode_key("auth", &self.keys.auth)?.len() != AUTH_LEN {
            return Err(Error::InvalidSubscription(format!(
                "keys.auth must be {} bytes",
                AUTH_LEN
            )));
        }

        Ok(())
    }

    /// Builds the stored record. `platform` falls back to the one detected
    /// from the request's user agent.
    pub fn into_model(
        self,
        user_agent: Option<String>,
    ) -> Result<model::Subscription, Error> {
        let expiration = match self.expiration_time {
            Some(ms) => {
                let at = DateTime::<Utc>::from_timestamp_millis(ms)
                    .ok_or_else(|| {
                        Error::InvalidSubscription(format!(
                            "expirationTime out of range: {}",
                            ms
                        ))
                    })?;
                Some(at)
            },
            None => None,
        };

        let platform = self
            .platform
            .or_else(|| user_agent.as_deref().map(Platform::detect))
            .map(|p| p.to_string());

        let user_id = self.user_id.filter(|id| !id.trim().is_empty());

        Ok(model::Subscription {
            endpoint: self.endpoint,
            p256dh: self.keys.p256dh,
            auth: self.keys.auth,
            user_id,
            platform,
            user_agent,
            expiration,
            created_at: None,
            updated_at: None,
        })
    }
}

fn decode_key(name: &str, value: &str) -> Result<Vec<u8>, Error> {
    BASE64_URL
        .decode(value.trim().trim_end_matches('='))
        .map_err(|e| {
            Error::InvalidSubscription(format!(
                "keys.{} is not base64url: {}",
                name, e
            ))
        })
}

// =============================================================================
// Platform
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Windows,
    Mac,
    Other,
}

impl Platform {
    pub fn detect(user_agent: &str) -> Platform {
        if ["iPhone", "iPad", "iPod"]
            .iter()
            .any(|device| user_agent.contains(device))
        {
            return Platform::Ios;
        }

        if user_agent.to_lowercase().contains("android") {
            return Platform::Android;
        }

        if user_agent.contains("Windows") {
            return Platform::Windows;
        }

        if user_agent.contains("Mac") {
            return Platform::Mac;
        }

        Platform::Other
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Ios => write!(f, "ios"),
            Platform::Android => write!(f, "android"),
            Platform::Windows => write!(f, "windows"),
            Platform::Mac => write!(f, "mac"),
            Platform::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Platform {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Platform, Self::Err> {
        match value {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "windows" => Ok(Platform::Windows),
            "mac" => Ok(Platform::Mac),
            "other" => Ok(Platform::Other),
            _ => Err(io::Error::other("Platform not supported")),
        }
    }
}
