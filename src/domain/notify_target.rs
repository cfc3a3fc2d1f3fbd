//! Type-safe notification target handle.
//!
//! [`NotifyTarget`] is a newtype wrapper around the opaque string the
//! notification sink understands (a Discord channel or user snowflake in
//! practice). The engine never interprets it.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where the notification sink should deliver a message.
///
/// Used as the routing key for sink deliveries and as the WebSocket
/// subscription filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct NotifyTarget(String);

impl NotifyTarget {
    /// Wraps an opaque target handle.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the raw handle.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the handle is empty (never a valid target).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NotifyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotifyTarget {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

impl From<String> for NotifyTarget {
    fn from(handle: String) -> Self {
        Self(handle)
    }
}
