//! Service layer: business logic orchestration.
//!
//! [`ScheduleService`] owns the reset registries and raid configurations.
//! [`RankTracker`] owns rank tracking records and runs the diff step
//! against the ladder source. Both persist through an optional
//! [`StateStore`](crate::persistence::StateStore).

pub mod rank_tracker;
pub mod schedule_service;

pub use rank_tracker::RankTracker;
pub use schedule_service::{
    DEFAULT_RAID_THRESHOLD, RaidConfiguration, ResetRegistration, ScheduleService,
};
