use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::timestamp::Timestamp;
use super::war::HousePair;
use crate::error::Rejection;
use crate::id::{HouseId, PlayerId};

const PEACE: &str = "peace";

/// What a war ballot voter chose: a house to declare war on, or peace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarChoice {
    Peace,
    House(HouseId),
}

impl WarChoice {
    /// Flat text form used by the database: `peace` or the house id.
    pub fn key(&self) -> &str {
        match self {
            WarChoice::Peace => PEACE,
            WarChoice::House(house) => house.as_str(),
        }
    }

    pub fn from_key(key: &str) -> Self {
        if key == PEACE {
            WarChoice::Peace
        } else {
            WarChoice::House(HouseId::new(key))
        }
    }

    pub fn house(&self) -> Option<&HouseId> {
        match self {
            WarChoice::Peace => None,
            WarChoice::House(house) => Some(house),
        }
    }
}

impl fmt::Display for WarChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarChoice::Peace => f.write_str(PEACE),
            WarChoice::House(house) => write!(f, "{house}"),
        }
    }
}

/// One member's vote in their house's war ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarVote {
    pub voter: PlayerId,
    /// The voter's house when the vote was cast.
    pub house: HouseId,
    pub choice: WarChoice,
    pub cast_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruceChoice {
    Yes,
    No,
}

string_enum!(TruceChoice {
    Yes => "yes",
    No => "no",
});

impl fmt::Display for TruceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for TruceChoice {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" => Ok(TruceChoice::Yes),
            "no" => Ok(TruceChoice::No),
            _ => Err(Rejection::UnknownTruceChoice),
        }
    }
}

/// One member's vote on ending the war between their house and `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruceVote {
    pub voter: PlayerId,
    pub house: HouseId,
    pub target: HouseId,
    pub choice: TruceChoice,
    pub cast_at: Timestamp,
}

impl TruceVote {
    pub fn pair(&self) -> HousePair {
        HousePair::of(&self.house, &self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    War,
    Truce,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Vote {
    War(WarVote),
    Truce(TruceVote),
}
