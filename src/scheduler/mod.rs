//! Polling scheduler: one generic runner and four task configurations.
//!
//! | Task                 | Entities                    | Due when                                   |
//! |----------------------|-----------------------------|--------------------------------------------|
//! | [`GuildResetTask`]   | guild reset registrations   | now in `[occurrence, occurrence + 60s)`    |
//! | [`PersonalResetTask`]| personal reset registrations| same                                       |
//! | [`RaidLaunchTask`]   | configured raids            | in window and tickets reach the threshold  |
//! | [`RankCheckTask`]    | enabled rank tracking       | every tick                                 |
//!
//! Each task runs in its own [`TaskRunner`], spawned from `main` and
//! stopped through a shared `CancellationToken`.

pub mod clock;
pub mod guild_reset;
pub mod personal_reset;
pub mod raid_launch;
pub mod rank_check;
pub mod runner;

pub use clock::{Clock, SystemClock};
pub use guild_reset::GuildResetTask;
pub use personal_reset::PersonalResetTask;
pub use raid_launch::RaidLaunchTask;
pub use rank_check::RankCheckTask;
pub use runner::{Due, ScheduledTask, TaskRunner, TickReport, fire_window};
