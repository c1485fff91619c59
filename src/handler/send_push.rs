use futures::{stream, StreamExt};

use crate::{
    error::Error,
    model::Subscription,
    types::{
        DeliveryOutcome, DispatchResult, NotificationPayload,
        SubscriptionFilter,
    },
};

/// Durable mapping from push endpoint to subscription.
#[allow(async_fn_in_trait)]
pub trait SubscriptionStore {
    /// Inserts, or replaces the row with the same endpoint.
    async fn upsert(&self, subscription: Subscription) -> Result<(), Error>;

    /// Deletes by endpoint. Returns the number of removed rows, 0 if absent.
    async fn remove(&self, endpoint: &str) -> Result<u64, Error>;

    async fn query(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<Subscription>, Error>;
}

/// Sends one encrypted message to one push endpoint and returns the HTTP
/// status reported by the push service.
#[allow(async_fn_in_trait)]
pub trait PushTransport {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
    ) -> Result<u16, Error>;
}

pub struct Dispatcher<'a, S, T> {
    store: &'a S,
    transport: &'a T,
    gone_status_codes: &'a [u16],
    max_tasks: usize,
}

impl<'a, S, T> Dispatcher<'a, S, T>
where
    S: SubscriptionStore,
    T: PushTransport,
{
    pub fn new(
        store: &'a S,
        transport: &'a T,
        gone_status_codes: &'a [u16],
        max_tasks: usize,
    ) -> Self {
        Dispatcher {
            store,
            transport,
            gone_status_codes,
            max_tasks: max_tasks.max(1),
        }
    }

    /// Fans `payload` out to every subscription matching `filter`.
    ///
    /// Per-subscription failures never fail the call; only loading the
    /// target set can. Endpoints the push service reports as gone are
    /// deleted before this returns.
    pub async fn dispatch(
        &self,
        payload: &NotificationPayload,
        filter: &SubscriptionFilter,
    ) -> Result<DispatchResult, Error> {
        let subscriptions = self.store.query(filter).await?;

        if subscriptions.is_empty() {
            tracing::info!("No subscriptions match {:?}", filter);
            return Ok(DispatchResult::default());
        }

        let data = payload.to_wire()?;
        let data = data.as_slice();

        let outcomes: Vec<(DeliveryOutcome, bool)> = stream::iter(
            subscriptions.iter(),
        )
        .map(|subscription| self.attempt(subscription, data))
        .buffer_unordered(self.max_tasks)
        .collect()
        .await;

        let mut result = DispatchResult::default();
        for (outcome, removed) in outcomes {
            result.record(outcome, removed);
        }

        tracing::info!(
            "Dispatched '{}': sent {}, failed {}, removed {}, total {}",
            payload.title,
            result.sent,
            result.failed,
            result.removed,
            result.total
        );

        Ok(result)
    }

    async fn attempt(
        &self,
        subscription: &Subscription,
        data: &[u8],
    ) -> (DeliveryOutcome, bool) {
        let outcome = match self.transport.deliver(subscription, data).await {
            Ok(status) => self.classify(status),
            Err(e) => {
                tracing::warn!(
                    "Push delivery to {} failed: {}",
                    subscription.endpoint,
                    e
                );
                DeliveryOutcome::SoftFailed
            },
        };

        if outcome != DeliveryOutcome::Gone {
            return (outcome, false);
        }

        match self.store.remove(&subscription.endpoint).await {
            Ok(_) => {
                tracing::info!(
                    "Removed gone subscription {}",
                    subscription.endpoint
                );
                (outcome, true)
            },
            Err(e) => {
                tracing::error!(
                    "Could not remove gone subscription {}: {}",
                    subscription.endpoint,
                    e
                );
                (outcome, false)
            },
        }
    }

    fn classify(&self, status: u16) -> DeliveryOutcome {
        if (200..300).contains(&status) {
            DeliveryOutcome::Delivered
        } else if self.gone_status_codes.contains(&status) {
            DeliveryOutcome::Gone
        } else {
            tracing::warn!("Push service answered with status {}", status);
            DeliveryOutcome::SoftFailed
        }
    }
}
