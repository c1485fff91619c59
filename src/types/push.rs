//! Push notification types
//!
//! Message headers, the notification payload sent to browsers, dispatch
//! filters and the aggregated result of one fan-out.

use serde::{Deserialize, Serialize};
use std::{fmt, io, str::FromStr};

use crate::error::Error;

// =============================================================================
// Push Message Types
// =============================================================================

#[derive(Debug, Clone)]
pub struct PushHeader {
    pub ttl: i64,
    pub urgency: Urgency,
}

pub const DEFAULT_LINK: &str = "/";

/// Notification content as the background worker expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        NotificationPayload {
            title: title.into(),
            body: body.into(),
            icon: None,
            link: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::MissingField("title"));
        }
        if self.body.trim().is_empty() {
            return Err(Error::MissingField("body"));
        }
        Ok(())
    }

    /// JSON sent over the wire. `link` always present.
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut wire = self.clone();
        if wire.link.as_deref().map_or(true, str::is_empty) {
            wire.link = Some(String::from(DEFAULT_LINK));
        }
        Ok(serde_json::to_vec(&wire)?)
    }
}

// =============================================================================
// Urgency Enum
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Urgency {
    VeryLow,
    Low,
    Normal,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Urgency::VeryLow => write!(f, "very-low"),
            Urgency::Low => write!(f, "low"),
            Urgency::Normal => write!(f, "normal"),
            Urgency::High => write!(f, "high"),
        }
    }
}

impl FromStr for Urgency {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Urgency, Self::Err> {
        match value {
            "very-low" => Ok(Urgency::VeryLow),
            "low" => Ok(Urgency::Low),
            "normal" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            _ => Err(io::Error::other("Urgency not supported")),
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Which subscriptions a dispatch targets. Both empty means broadcast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionFilter {
    pub user_id: Option<String>,
    pub exclude_user_id: Option<String>,
}

impl SubscriptionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(user_id: impl Into<String>) -> Self {
        SubscriptionFilter {
            user_id: Some(user_id.into()),
            exclude_user_id: None,
        }
    }

    pub fn except(user_id: impl Into<String>) -> Self {
        SubscriptionFilter {
            user_id: None,
            exclude_user_id: Some(user_id.into()),
        }
    }

    pub fn matches(&self, user_id: Option<&str>) -> bool {
        if let Some(only) = &self.user_id {
            if user_id != Some(only.as_str()) {
                return false;
            }
        }
        if let Some(excluded) = &self.exclude_user_id {
            if user_id == Some(excluded.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Transient failure, the subscription is kept.
    SoftFailed,
    /// The push service reported the endpoint as permanently invalid.
    Gone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub sent: usize,
    pub failed: usize,
    pub removed: usize,
    pub total: usize,
}

impl DispatchResult {
    pub fn record(&mut self, outcome: DeliveryOutcome, removed: bool) {
        self.total += 1;
        match outcome {
            DeliveryOutcome::Delivered => self.sent += 1,
            DeliveryOutcome::SoftFailed | DeliveryOutcome::Gone => {
                self.failed += 1
            },
        }
        if removed {
            self.removed += 1;
        }
    }

    pub fn merge(&mut self, other: &DispatchResult) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.removed += other.removed;
        self.total += other.total;
    }
}

// =============================================================================
// JWT Claims
// =============================================================================

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String,
    pub sub: String,
    pub exp: i64,
}
