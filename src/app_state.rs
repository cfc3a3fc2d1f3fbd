//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::scheduler::Clock;
use crate::service::{RankTracker, ScheduleService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reset triggers and raid launches.
    pub schedule: Arc<ScheduleService>,
    /// Arena rank tracking.
    pub tracker: Arc<RankTracker>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Clock shared with the scheduler.
    pub clock: Arc<dyn Clock>,
}
