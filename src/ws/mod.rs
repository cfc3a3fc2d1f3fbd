//! WebSocket layer: notification streaming with per-target subscriptions.
//!
//! Clients connect to `/ws`, subscribe to one or more notification
//! targets (or `"*"` for all), and receive every [`Dispatch`](crate::domain::Dispatch)
//! addressed to them as an `event` message.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
