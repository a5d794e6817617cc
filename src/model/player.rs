use serde::{Deserialize, Serialize};

use crate::id::{HouseId, PlayerId, TileId};

/// A player's standing: house membership plus the resources the engine
/// spends and rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub house: Option<HouseId>,
    pub troops: u64,
    pub ships: u64,
    pub money: u64,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            house: None,
            troops: 0,
            ships: 0,
            money: 0,
        }
    }

    pub fn is_member_of(&self, house: &HouseId) -> bool {
        self.house.as_ref() == Some(house)
    }
}

/// A castle tile on the map. Unclaimed tiles have no owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub owner: Option<HouseId>,
}
