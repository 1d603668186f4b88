//! Listing registry for residential houses: token-gated access, single-moderator
//! listing moderation and best-effort subscriber notifications.

pub mod auth;
pub mod config;
pub mod error;
pub mod listings;
pub mod notifications;
pub mod request_id;
pub mod telemetry;
