//! The storage contract the engine evaluates against.
//!
//! The engine only reads through [`EntityStore`] and never writes directly:
//! every change travels as an [`Intent`] through [`CommitIntent`].

mod memory;

pub use memory::MemoryStore;

use crate::error::{CommitError, StoreError};
use crate::id::{HouseId, PlayerId, SiegeId, TileId};
use crate::model::{
    HousePair, Intent, Player, Pledge, Siege, Tile, TruceVote, Vote, VoteType, WarVote,
};

/// Read side of the durable game state.
pub trait EntityStore {
    fn tile(&self, tile: &TileId) -> Result<Option<Tile>, StoreError>;

    fn tile_owner(&self, tile: &TileId) -> Result<Option<HouseId>, StoreError> {
        Ok(self.tile(tile)?.and_then(|t| t.owner))
    }

    fn player(&self, player: &PlayerId) -> Result<Option<Player>, StoreError>;

    /// Current members of a house, ordered by player id.
    fn house_members(&self, house: &HouseId) -> Result<Vec<Player>, StoreError>;

    fn siege(&self, siege: SiegeId) -> Result<Option<Siege>, StoreError>;

    fn active_siege(&self, tile: &TileId) -> Result<Option<Siege>, StoreError>;

    fn active_sieges(&self) -> Result<Vec<Siege>, StoreError>;

    /// Pledges of a siege in submission order.
    fn pledges_for_siege(&self, siege: SiegeId) -> Result<Vec<Pledge>, StoreError>;

    fn pledges_for_player(&self, player: &PlayerId) -> Result<Vec<Pledge>, StoreError>;

    fn war_exists(&self, a: &HouseId, b: &HouseId) -> Result<bool, StoreError>;

    fn votes_by_voter_and_type(
        &self,
        voter: &PlayerId,
        kind: VoteType,
    ) -> Result<Vec<Vote>, StoreError>;

    /// War votes cast by current members of `house`.
    fn war_votes_for_house(&self, house: &HouseId) -> Result<Vec<WarVote>, StoreError>;

    /// Houses with at least one outstanding war vote.
    fn war_ballot_houses(&self) -> Result<Vec<HouseId>, StoreError>;

    fn truce_votes_for_pair(&self, pair: &HousePair) -> Result<Vec<TruceVote>, StoreError>;

    /// House pairs with at least one outstanding truce vote.
    fn truce_ballot_pairs(&self) -> Result<Vec<HousePair>, StoreError>;
}

/// Write side: apply an intent all-or-nothing.
///
/// Implementations re-check the preconditions each mutation relies on and
/// return [`CommitError::Stale`] without applying anything if one no longer
/// holds.
pub trait CommitIntent {
    fn commit(&mut self, intent: &Intent) -> Result<(), CommitError>;
}
