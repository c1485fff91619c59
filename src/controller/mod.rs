//! API controllers, mounted under `/api`.

pub mod api_key;
pub mod notify_other;
pub mod push_subscription;
pub mod send_notification;
pub mod send_spray_reminder;
pub mod test_push;
pub mod vapid_public_key;
pub mod version;
