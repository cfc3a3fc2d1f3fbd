//! # reset-herald
//!
//! Daily reset scheduling and arena rank-change detection for a game
//! community bot.
//!
//! The engine keeps per-guild and per-member daily reset registrations,
//! fires them once per day at the correct wall-clock instant (DST
//! included), launches guild raids when enough tickets have accumulated,
//! and polls arena ladders to notify players when their rank or a watched
//! opponent's rank changes. Chat delivery is behind the
//! [`NotificationSink`](sink::NotificationSink) trait and ladder data
//! behind [`LadderRankSource`](source::LadderRankSource).
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)          Tick (every 60s)
//!     │                                  │
//!     ├── REST Handlers (api/)           ├── TaskRunner × 4 (scheduler/)
//!     ├── WS Handler (ws/)               │
//!     │                                  │
//!     ├── ScheduleService ───────────────┤
//!     ├── RankTracker ───────────────────┘
//!     │       │
//!     │       └── LadderRankSource (source/)
//!     │
//!     ├── TriggerRegistry, TimeMath, Payout (domain/)
//!     ├── NotificationSink → EventBus / webhook (sink/)
//!     │
//!     └── PostgreSQL Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod source;
pub mod ws;
