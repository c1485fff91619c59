//! Reminder Trigger
//!
//! Evaluates the configured scheduled times against "now" and broadcasts a
//! reminder for each slot that is about to start, unless that slot was
//! already done or already reminded about. Scheduling itself is external:
//! every call is one pass.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::{
    error::Error,
    handler::send_push::{Dispatcher, PushTransport, SubscriptionStore},
    types::{DispatchResult, NotificationPayload, SubscriptionFilter},
};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Read side of the appointment data plus the reminder log.
#[allow(async_fn_in_trait)]
pub trait ReminderStore {
    async fn scheduled_times(&self) -> Result<Vec<String>, Error>;

    async fn is_completed(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<bool, Error>;

    /// Records the reminder for a slot. Returns false when another pass
    /// already holds it.
    async fn claim(&self, date: NaiveDate, time: &str) -> Result<bool, Error>;

    /// Drops a claim whose broadcast reached nobody.
    async fn release(&self, date: NaiveDate, time: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReminderStatus {
    OutsideWindow,
    AlreadyCompleted,
    AlreadyNotified,
    NoSubscribers,
    InvalidTime,
    Sent(DispatchResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderDetail {
    pub time: String,
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub status: ReminderStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReminderReport {
    pub stats: DispatchResult,
    pub details: Vec<ReminderDetail>,
}

impl ReminderReport {
    fn push(
        &mut self,
        time: &str,
        date: Option<NaiveDate>,
        status: ReminderStatus,
    ) {
        if let ReminderStatus::Sent(result) = &status {
            self.stats.merge(result);
        }
        self.details.push(ReminderDetail {
            time: time.to_owned(),
            date,
            status,
        });
    }
}

/// Parses `HH:MM` into minutes since midnight.
pub fn parse_time(value: &str) -> Result<u32, Error> {
    let invalid = || Error::InvalidTime(value.to_owned());

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;

    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    Ok(hours * 60 + minutes)
}

/// Minutes from `now` until the next occurrence of `slot`, in `0..1440`.
fn minutes_until(now: NaiveDateTime, slot: u32) -> u32 {
    let current = now.hour() * 60 + now.minute();
    (slot + MINUTES_PER_DAY - current) % MINUTES_PER_DAY
}

pub fn reminder_payload(time: &str) -> NotificationPayload {
    NotificationPayload::new(
        "Cat spray reminder",
        format!(
            "It's almost time for the {} application of the cat spray.",
            time
        ),
    )
    .with_link("/")
}

pub struct ReminderTrigger<'a, R, S, T> {
    reminders: &'a R,
    dispatcher: Dispatcher<'a, S, T>,
    window_minutes: u32,
}

impl<'a, R, S, T> ReminderTrigger<'a, R, S, T>
where
    R: ReminderStore,
    S: SubscriptionStore,
    T: PushTransport,
{
    pub fn new(
        reminders: &'a R,
        dispatcher: Dispatcher<'a, S, T>,
        window_minutes: u32,
    ) -> Self {
        ReminderTrigger {
            reminders,
            dispatcher,
            window_minutes,
        }
    }

    /// One pass over every scheduled time. A slot fires when it starts
    /// within the next `window_minutes`, not at or after its start.
    pub async fn run(
        &self,
        now: NaiveDateTime,
    ) -> Result<ReminderReport, Error> {
        let times = self.reminders.scheduled_times().await?;
        let mut report = ReminderReport::default();

        for time in times {
            let slot = match parse_time(&time) {
                Ok(slot) => slot,
                Err(e) => {
                    tracing::warn!("Skipping scheduled time: {}", e);
                    report.push(&time, None, ReminderStatus::InvalidTime);
                    continue;
                },
            };

            let until = minutes_until(now, slot);
            if until == 0 || until > self.window_minutes {
                report.push(&time, None, ReminderStatus::OutsideWindow);
                continue;
            }

            // Slots past midnight belong to tomorrow.
            let current = now.hour() * 60 + now.minute();
            let date = if current + until >= MINUTES_PER_DAY {
                now.date() + Duration::days(1)
            } else {
                now.date()
            };

            let status = self.remind(date, &time).await?;
            report.push(&time, Some(date), status);
        }

        tracing::info!(
            "Reminder pass at {}: {} slots, sent {}, failed {}, removed {}",
            now,
            report.details.len(),
            report.stats.sent,
            report.stats.failed,
            report.stats.removed
        );

        Ok(report)
    }

    /// Sends the reminder for one slot regardless of the time window.
    pub async fn run_for(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<ReminderReport, Error> {
        parse_time(time)?;

        let mut report = ReminderReport::default();
        let status = self.remind(date, time).await?;
        report.push(time, Some(date), status);

        Ok(report)
    }

    async fn remind(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<ReminderStatus, Error> {
        if self.reminders.is_completed(date, time).await? {
            tracing::info!("Slot {} {} already completed, skipping", date, time);
            return Ok(ReminderStatus::AlreadyCompleted);
        }

        if !self.reminders.claim(date, time).await? {
            tracing::info!("Reminder for {} {} already sent", date, time);
            return Ok(ReminderStatus::AlreadyNotified);
        }

        let result = match self
            .dispatcher
            .dispatch(&reminder_payload(time), &SubscriptionFilter::all())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.reminders.release(date, time).await?;
                return Err(e);
            },
        };

        if result.sent == 0 {
            self.reminders.release(date, time).await?;
        }

        if result.total == 0 {
            return Ok(ReminderStatus::NoSubscribers);
        }

        Ok(ReminderStatus::Sent(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        subscription, FakeTransport, MemoryReminders, MemoryStore,
    };

    const GONE: &[u16] = &[404, 410];

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(
            &format!("{} {}", date, time),
            "%Y-%m-%d %H:%M",
        )
        .unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::with(vec![
            subscription("https://push.example/a", Some("alice")),
            subscription("https://push.example/b", Some("bob")),
        ])
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("08:00").unwrap(), 480);
        assert_eq!(parse_time("23:59").unwrap(), 1439);
        assert_eq!(parse_time("0:05").unwrap(), 5);
        assert!(matches!(parse_time("24:00"), Err(Error::InvalidTime(_))));
        assert!(matches!(parse_time("8h"), Err(Error::InvalidTime(_))));
        assert!(matches!(parse_time("08:60"), Err(Error::InvalidTime(_))));
    }

    #[test]
    fn test_minutes_until_wraps_midnight() {
        assert_eq!(minutes_until(at("2024-05-01", "07:56"), 480), 4);
        assert_eq!(minutes_until(at("2024-05-01", "08:00"), 480), 0);
        assert_eq!(minutes_until(at("2024-05-01", "23:57"), 0), 3);
        assert_eq!(minutes_until(at("2024-05-01", "08:01"), 480), 1439);
    }

    #[tokio::test]
    async fn test_fires_inside_window() {
        let reminders = MemoryReminders::with_times(&["08:00", "20:00"]);
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        let report = trigger.run(at("2024-05-01", "07:57")).await.unwrap();

        assert_eq!(report.stats.sent, 2);
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.details[0].date, Some(day("2024-05-01")));
        assert!(matches!(report.details[0].status, ReminderStatus::Sent(_)));
        assert_eq!(report.details[1].status, ReminderStatus::OutsideWindow);
        assert!(reminders.notified(day("2024-05-01"), "08:00"));
    }

    #[tokio::test]
    async fn test_does_not_fire_at_or_after_slot() {
        let reminders = MemoryReminders::with_times(&["08:00"]);
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        for now in ["08:00", "08:03", "07:54"] {
            let report = trigger.run(at("2024-05-01", now)).await.unwrap();
            assert_eq!(report.details[0].status, ReminderStatus::OutsideWindow);
        }
        assert!(transport.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_completed_slot_suppresses_dispatch() {
        let reminders = MemoryReminders::with_times(&["08:00"]);
        reminders.complete(day("2024-05-01"), "08:00");
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        let report = trigger.run(at("2024-05-01", "07:58")).await.unwrap();

        assert_eq!(report.details[0].status, ReminderStatus::AlreadyCompleted);
        assert_eq!(report.stats, DispatchResult::default());
        assert!(transport.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_is_deduplicated() {
        let reminders = MemoryReminders::with_times(&["20:00"]);
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        trigger.run(at("2024-05-01", "19:56")).await.unwrap();
        let second = trigger.run(at("2024-05-01", "19:58")).await.unwrap();

        assert_eq!(second.details[0].status, ReminderStatus::AlreadyNotified);
        assert_eq!(transport.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_midnight_slot_uses_next_day() {
        let reminders = MemoryReminders::with_times(&["00:00"]);
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        let report = trigger.run(at("2024-05-01", "23:56")).await.unwrap();

        assert_eq!(report.details[0].date, Some(day("2024-05-02")));
        assert!(reminders.notified(day("2024-05-02"), "00:00"));
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_logged() {
        let reminders = MemoryReminders::with_times(&["08:00"]);
        let store =
            MemoryStore::with(vec![subscription("https://push.example/a", None)]);
        let transport =
            FakeTransport::default().respond("https://push.example/a", 500);
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        let report = trigger.run(at("2024-05-01", "07:59")).await.unwrap();

        assert_eq!(report.stats.failed, 1);
        assert!(!reminders.notified(day("2024-05-01"), "08:00"));
    }

    #[tokio::test]
    async fn test_no_subscribers_and_invalid_times() {
        let reminders = MemoryReminders::with_times(&["08:00", "bogus"]);
        let store = MemoryStore::default();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        let report = trigger.run(at("2024-05-01", "07:58")).await.unwrap();

        assert_eq!(report.details[0].status, ReminderStatus::NoSubscribers);
        assert_eq!(report.details[1].status, ReminderStatus::InvalidTime);
    }

    #[tokio::test]
    async fn test_overlapping_passes_send_once() {
        let reminders = MemoryReminders::with_times(&["08:00"]);
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );
        let now = at("2024-05-01", "07:57");

        let (first, second) = tokio::join!(trigger.run(now), trigger.run(now));
        let statuses = [
            first.unwrap().details[0].status.clone(),
            second.unwrap().details[0].status.clone(),
        ];

        let sent = statuses
            .iter()
            .filter(|s| matches!(s, ReminderStatus::Sent(_)))
            .count();
        assert_eq!(sent, 1);
        assert!(statuses.contains(&ReminderStatus::AlreadyNotified));
        assert_eq!(transport.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_error_releases_slot() {
        let reminders = MemoryReminders::with_times(&["08:00"]);
        let store = store();
        store.set_unavailable(true);
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        assert!(trigger.run(at("2024-05-01", "07:57")).await.is_err());
        assert!(!reminders.notified(day("2024-05-01"), "08:00"));

        store.set_unavailable(false);
        let report = trigger.run(at("2024-05-01", "07:58")).await.unwrap();
        assert_eq!(report.stats.sent, 2);
    }

    #[tokio::test]
    async fn test_run_for_ignores_window() {
        let reminders = MemoryReminders::with_times(&[]);
        let store = store();
        let transport = FakeTransport::default();
        let trigger = ReminderTrigger::new(
            &reminders,
            Dispatcher::new(&store, &transport, GONE, 4),
            5,
        );

        let report = trigger.run_for(day("2024-05-01"), "13:30").await.unwrap();

        assert_eq!(report.stats.sent, 2);
        assert!(trigger.run_for(day("2024-05-01"), "noon").await.is_err());
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = ReminderDetail {
            time: String::from("08:00"),
            date: None,
            status: ReminderStatus::AlreadyCompleted,
        };
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["status"], "already_completed");
        assert_eq!(json["time"], "08:00");
    }
}
