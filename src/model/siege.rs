use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::timestamp::Timestamp;
use crate::error::Rejection;
use crate::id::{HouseId, PlayerId, PledgeId, SiegeId, TileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiegeState {
    Active,
    Resolved,
}

string_enum!(SiegeState {
    Active => "active",
    Resolved => "resolved",
});

/// A time-boxed contest over a tile between an attacking house and the
/// tile's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Siege {
    pub id: SiegeId,
    pub tile: TileId,
    pub attacker: HouseId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub state: SiegeState,
}

impl Siege {
    pub fn is_active(&self) -> bool {
        self.state == SiegeState::Active
    }

    /// Resolution may run exactly at expiry or later, never before.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attack,
    Defend,
}

string_enum!(Side {
    Attack => "attack",
    Defend => "defend",
});

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Side {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attack" => Ok(Side::Attack),
            "defend" => Ok(Side::Defend),
            _ => Err(Rejection::UnknownSide),
        }
    }
}

/// A troop commitment by one player to one side of one siege. Troops were
/// deducted when the pledge was made; the record is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: PledgeId,
    pub siege: SiegeId,
    pub player: PlayerId,
    pub troops: u64,
    pub side: Side,
    pub pledged_at: Timestamp,
}
