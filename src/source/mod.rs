//! Ladder-rank data sources.
//!
//! The rank tracker only sees the [`LadderRankSource`] trait. The shipped
//! implementation is [`ComlinkSource`], which talks to a comlink-style
//! game data proxy over HTTP.

pub mod comlink;

use async_trait::async_trait;

use crate::domain::PlayerRanks;
use crate::error::HeraldError;

pub use comlink::ComlinkSource;

/// Looks up a player's current arena ranks by external id.
#[async_trait]
pub trait LadderRankSource: Send + Sync + std::fmt::Debug {
    /// Fetches current ranks for `external_id`.
    ///
    /// Returns `Ok(None)` when the source has no such player.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::SourceUnavailable`] when the source cannot be
    /// reached or its answer cannot be understood.
    async fn fetch_ranks(&self, external_id: &str) -> Result<Option<PlayerRanks>, HeraldError>;
}
