//! Domain layer: time math, trigger records, rank tracking state, and
//! notification payloads.
//!
//! Everything here is free of I/O. Time-dependent functions take `now` as
//! a parameter; the only clock reads happen in the scheduler.

pub mod activity;
pub mod event_bus;
pub mod keyed_store;
pub mod ladder;
pub mod notification;
pub mod notify_target;
pub mod payout;
pub mod rank_state;
pub mod time_math;
pub mod trigger;
pub mod trigger_registry;

pub use activity::ActivityMessage;
pub use event_bus::EventBus;
pub use keyed_store::KeyedStore;
pub use ladder::{LadderType, PlayerRanks};
pub use notification::{Dispatch, Notification, RankGlyph, RankRow};
pub use notify_target::NotifyTarget;
pub use payout::{PayoutWindow, payout_window};
pub use rank_state::{ChangeEvent, RankKey, RankState};
pub use trigger::{RaidLaunch, TimeFormat, TriggerKind, TriggerRecord};
pub use trigger_registry::TriggerRegistry;
