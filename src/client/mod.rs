//! Subscription Client
//!
//! Browser-side subscription lifecycle. Platform capabilities are reached
//! through [`PushRuntime`] and the server through [`SubscriptionApi`], so the
//! state machine runs the same against a real browser bridge or a test double.

use thiserror::Error;

mod api;
mod subscriber;
mod support;

pub use self::{
    api::{decode_application_server_key, HttpSubscriptionApi},
    subscriber::{
        BrowserSubscription, ClientState, PushClient, PushRuntime,
        SubscribeOptions, SubscriptionApi, WORKER_SCRIPT,
    },
    support::{
        check_support, ios_version, Capabilities, PermissionState,
        SupportState, MIN_IOS_VERSION,
    },
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Push notifications are not supported: {0}")]
    Unsupported(String),

    #[error("Notification permission was denied")]
    PermissionDenied,

    #[error("No active push subscription")]
    NoActiveSubscription,

    #[error("Could not sync the subscription with the server: {0}")]
    ServerSync(String),

    #[error("Push runtime error: {0}")]
    Runtime(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::ServerSync(err.to_string())
    }
}
