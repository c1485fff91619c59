pub use self::{
    push::{
        Claims, DeliveryOutcome, DispatchResult, NotificationPayload,
        PushHeader, SubscriptionFilter, Urgency, DEFAULT_LINK,
    },
    subscription::{
        Platform, RemoveSubscriptionRequest, SubscriptionKeys,
        SubscriptionRequest,
    },
};

mod push;
mod subscription;
