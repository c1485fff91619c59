use serde::Deserialize;
use url::Url;

use super::{Notification, WorkerConfig};
use crate::types::DEFAULT_LINK;

#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// Id of the window that was brought to front.
    Focused(String),
    /// URL of the newly opened window.
    Opened(String),
}

#[derive(Debug, Default, Deserialize)]
struct PushMessage {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    link: Option<String>,
}

/// Builds the notification for a push event. Never fails: malformed data is
/// shown as plain text and missing data gets the defaults.
pub fn notification_from_push(
    data: Option<&[u8]>,
    config: &WorkerConfig,
) -> Notification {
    let message = match data {
        None => PushMessage::default(),
        Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
            PushMessage::default()
        },
        Some(bytes) => match serde_json::from_slice::<PushMessage>(bytes) {
            Ok(message) => message,
            Err(_) => PushMessage {
                body: Some(String::from_utf8_lossy(bytes).trim().to_owned()),
                ..PushMessage::default()
            },
        },
    };

    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

    Notification {
        title: non_empty(message.title)
            .unwrap_or_else(|| config.default_title.to_owned()),
        body: non_empty(message.body)
            .unwrap_or_else(|| config.default_body.to_owned()),
        icon: non_empty(message.icon).unwrap_or_else(|| config.icon.to_owned()),
        badge: config.badge.to_owned(),
        data: non_empty(message.link)
            .unwrap_or_else(|| String::from(DEFAULT_LINK)),
    }
}

/// Whether an open window shows `target`, given absolute or as a path.
pub fn matches_target(client_url: &str, target: &str) -> bool {
    if client_url == target {
        return true;
    }

    let client = match Url::parse(client_url) {
        Ok(url) => url,
        Err(_) => return false,
    };

    match Url::parse(target) {
        Ok(target) => client == target,
        Err(_) => {
            let path = match client.query() {
                Some(query) => format!("{}?{}", client.path(), query),
                None => client.path().to_owned(),
            };
            path == target
        },
    }
}
