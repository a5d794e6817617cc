use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::report::Outcome;
use super::siege::Side;
use super::timestamp::Timestamp;
use super::vote::{TruceVote, WarVote};
use super::war::HousePair;
use crate::error::Rejection;
use crate::id::{HouseId, PlayerId, SiegeId, TileId};

/// The entity scope a mutation writes. Two actions touching the same key
/// must be serialized; actions on disjoint keys run independently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "key", rename_all = "snake_case")]
pub enum EntityKey {
    /// A tile together with its (at most one) active siege and pledges.
    Tile(TileId),
    /// A house's war ballot.
    WarBallot(HouseId),
    /// The truce ballot of a house pair, and the war between them.
    TruceBallot(HousePair),
    Player(PlayerId),
}

/// One intended state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mutation {
    SetPlayerHouse {
        player: PlayerId,
        house: HouseId,
    },
    /// Deduct troops the player must still have at commit time.
    SpendTroops {
        player: PlayerId,
        troops: u64,
    },
    /// Add or remove resources; troops and money never drop below zero.
    AdjustPlayer {
        player: PlayerId,
        troops: i64,
        money: i64,
    },
    SetTileOwner {
        tile: TileId,
        owner: Option<HouseId>,
    },
    InsertSiege {
        tile: TileId,
        attacker: HouseId,
        created_at: Timestamp,
        expires_at: Timestamp,
    },
    RemoveSiege {
        siege: SiegeId,
        tile: TileId,
    },
    InsertPledge {
        siege: SiegeId,
        tile: TileId,
        player: PlayerId,
        troops: u64,
        side: Side,
        pledged_at: Timestamp,
    },
    RemovePledges {
        siege: SiegeId,
        tile: TileId,
    },
    InsertWar {
        pair: HousePair,
    },
    RemoveWar {
        pair: HousePair,
    },
    InsertWarVote {
        vote: WarVote,
    },
    RemoveWarVotes {
        house: HouseId,
        voters: Vec<PlayerId>,
    },
    InsertTruceVote {
        vote: TruceVote,
    },
    RemoveTruceVotes {
        pair: HousePair,
    },
}

impl Mutation {
    pub fn entity_key(&self) -> EntityKey {
        match self {
            Mutation::SetPlayerHouse { player, .. }
            | Mutation::SpendTroops { player, .. }
            | Mutation::AdjustPlayer { player, .. } => EntityKey::Player(player.clone()),
            Mutation::SetTileOwner { tile, .. }
            | Mutation::InsertSiege { tile, .. }
            | Mutation::RemoveSiege { tile, .. }
            | Mutation::InsertPledge { tile, .. }
            | Mutation::RemovePledges { tile, .. } => EntityKey::Tile(tile.clone()),
            Mutation::InsertWar { pair }
            | Mutation::RemoveWar { pair }
            | Mutation::RemoveTruceVotes { pair } => EntityKey::TruceBallot(pair.clone()),
            Mutation::InsertTruceVote { vote } => EntityKey::TruceBallot(vote.pair()),
            Mutation::InsertWarVote { vote } => EntityKey::WarBallot(vote.house.clone()),
            Mutation::RemoveWarVotes { house, .. } => EntityKey::WarBallot(house.clone()),
        }
    }
}

/// The result of evaluating an action or a resolution: what to change, what
/// to tell the actor, and what to announce.
///
/// Evaluation never applies anything itself; a store commits the intent
/// atomically or rejects it as stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub mutations: Vec<Mutation>,
    pub reply: String,
    pub outcome: Option<Outcome>,
}

impl Intent {
    /// An intent with no mutations, only a reply.
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            mutations: Vec::new(),
            reply: reply.into(),
            outcome: None,
        }
    }

    pub fn rejected(rejection: &Rejection) -> Self {
        Self::reply(rejection.to_string())
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Every key this intent writes, in lock-acquisition order.
    pub fn entity_keys(&self) -> BTreeSet<EntityKey> {
        self.mutations.iter().map(Mutation::entity_key).collect()
    }
}
