//! Database entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One browser push registration, keyed by `endpoint`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: Option<String>,
    pub platform: Option<String>,
    pub user_agent: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A completed dose for a scheduled slot. Written by the front end.
#[derive(Debug, Clone, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub time: String,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Notification_Log {
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Settings {
    pub id: String,
    pub daily_frequency: i32,
    pub scheduled_times: Vec<String>,
}

impl Settings {
    pub const CAT_SPRAY: &'static str = "cat_spray";

    pub fn default_scheduled_times() -> Vec<String> {
        vec![String::from("08:00"), String::from("20:00")]
    }
}
