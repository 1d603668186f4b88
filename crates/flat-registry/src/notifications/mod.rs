//! Best-effort fan-out of "new listing" notifications to house subscribers.

pub mod dispatcher;
pub mod domain;

pub use dispatcher::{
    deliver, notification_channel, DeliveryQueue, DeliveryReport, ListingCreated,
    NotificationDispatcher,
};
pub use domain::{
    ContactAddress, InvalidContact, Notification, NotificationError, NotificationSender,
    SubscriberDirectory,
};
