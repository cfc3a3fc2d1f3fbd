//! In-process fan-out of addressed notifications.
//!
//! Every reset, raid launch and rank message becomes a [`Dispatch`] (a
//! notification plus its notify target). [`BroadcastSink`] publishes each
//! dispatch here once; every open WebSocket connection holds its own
//! receiver and forwards only the dispatches whose target it subscribed
//! to (see `ws::subscription`).
//!
//! [`BroadcastSink`]: crate::sink::BroadcastSink

use tokio::sync::broadcast;

use super::Dispatch;

/// Shared sender side of the dispatch fan-out.
///
/// Cloning is cheap; all clones feed the same receivers. A connection that
/// falls more than `capacity` dispatches behind skips the oldest ones and
/// is told how many it missed.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Dispatch>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` dispatches per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Hands `dispatch` to every connected receiver and returns how many
    /// there were. [`BroadcastSink`](crate::sink::BroadcastSink) treats
    /// zero as a failed delivery.
    pub fn publish(&self, dispatch: Dispatch) -> usize {
        self.sender.send(dispatch).unwrap_or(0)
    }

    /// Receiver for dispatches published from now on; one per connection.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Dispatch> {
        self.sender.subscribe()
    }

    /// Number of open receivers, reported by the health endpoint.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
