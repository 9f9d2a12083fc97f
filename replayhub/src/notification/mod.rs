//! Notification pipeline: events, payload rendering, transports, delivery.

pub mod delivery;
pub mod events;
pub mod payload;
pub mod transports;

pub use delivery::{DeliveryService, DeliveryStats};
pub use events::{NotificationCategory, NotificationEvent};
pub use payload::{ActionLink, MessagePayload, PayloadField};
pub use transports::{
    BotApiTransport, ChannelTransport, HttpWebhookTransport, WebhookTransport,
};
