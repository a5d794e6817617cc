//! Resolution outcomes, returned for notification.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::vote::WarChoice;
use super::war::HousePair;
use crate::id::{HouseId, PlayerId, SiegeId, TileId};

/// Notification channel an outcome is announced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Siege results.
    BattleReports,
    /// Wars declared and ended.
    Overworld,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Siege(SiegeReport),
    War(WarBallotReport),
    Truce(TruceBallotReport),
}

impl Outcome {
    pub fn channel(&self) -> Channel {
        match self {
            Outcome::Siege(_) => Channel::BattleReports,
            Outcome::War(_) | Outcome::Truce(_) => Channel::Overworld,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Siege(report) => report.fmt(f),
            Outcome::War(report) => report.fmt(f),
            Outcome::Truce(report) => report.fmt(f),
        }
    }
}

/// An amount credited to or debited from one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerShare {
    pub player: PlayerId,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiegeVerdict {
    /// Nobody had troops committed; the siege simply closed.
    Uncontested,
    AttackerWon,
    DefenderHeld,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiegeReport {
    pub siege: SiegeId,
    pub tile: TileId,
    pub attacker: HouseId,
    pub defender: Option<HouseId>,
    pub verdict: SiegeVerdict,
    pub attack_total: u64,
    pub defend_total: u64,
    pub pledge_count: usize,
    /// Troops lost by the losing side, equal to the sum of `losses`.
    pub troops_lost: u64,
    pub losses: Vec<PlayerShare>,
    pub money_pot: u64,
    pub money_shares: Vec<PlayerShare>,
    pub troop_pot: u64,
    pub troop_shares: Vec<PlayerShare>,
}

impl SiegeReport {
    pub fn attacker_won(&self) -> bool {
        self.verdict == SiegeVerdict::AttackerWon
    }
}

impl fmt::Display for SiegeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defender = self
            .defender
            .as_ref()
            .map_or_else(|| "nobody".to_string(), |h| h.to_string());
        match self.verdict {
            SiegeVerdict::Uncontested => write!(
                f,
                "the siege of {} by {} ended with no troops committed, {defender} keeps the castle",
                self.tile, self.attacker
            ),
            SiegeVerdict::AttackerWon => write!(
                f,
                "{} captured {} from {defender} with {} troops against {}, the defenders lost {} troops",
                self.attacker, self.tile, self.attack_total, self.defend_total, self.troops_lost
            ),
            SiegeVerdict::DefenderHeld => write!(
                f,
                "{defender} held {} against {} with {} troops against {}, the attackers lost {} troops",
                self.tile, self.attacker, self.defend_total, self.attack_total, self.troops_lost
            ),
        }
    }
}

/// Why a ballot closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotClose {
    /// Every eligible voter voted.
    Quorum,
    /// The voting window elapsed.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCount {
    pub choice: WarChoice,
    pub votes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "house", rename_all = "snake_case")]
pub enum WarVerdict {
    Peace,
    WarDeclared(HouseId),
    /// The ballot chose a house the voting house is already at war with.
    AlreadyAtWar(HouseId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarBallotReport {
    pub house: HouseId,
    pub closed_by: BallotClose,
    pub eligible: usize,
    pub tally: Vec<ChoiceCount>,
    pub verdict: WarVerdict,
}

impl fmt::Display for WarBallotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            WarVerdict::Peace => write!(f, "{} has voted for peace", self.house),
            WarVerdict::WarDeclared(target) => {
                write!(f, "{} has declared war on {target}", self.house)
            }
            WarVerdict::AlreadyAtWar(target) => write!(
                f,
                "{} voted for war with {target}, but they are already at war",
                self.house
            ),
        }
    }
}

/// YES/NO counts of one house in a truce ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseTally {
    pub house: HouseId,
    pub yes: usize,
    pub no: usize,
    pub eligible: usize,
}

impl HouseTally {
    /// At least half of the eligible members voted YES.
    pub fn agrees(&self) -> bool {
        self.yes * 2 >= self.eligible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruceVerdict {
    Agreed,
    WarContinues,
    /// The war had already ended when the ballot closed.
    NoWar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruceBallotReport {
    pub pair: HousePair,
    pub closed_by: BallotClose,
    pub houses: Vec<HouseTally>,
    pub verdict: TruceVerdict,
}

impl fmt::Display for TruceBallotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            TruceVerdict::Agreed => write!(f, "{} have agreed to a truce", self.pair),
            TruceVerdict::WarContinues => {
                write!(f, "{} failed to agree on a truce, the war continues", self.pair)
            }
            TruceVerdict::NoWar => write!(f, "{} are no longer at war", self.pair),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_of_eligible_agrees() {
        let tally = |yes, eligible| HouseTally {
            house: HouseId::new("bear"),
            yes,
            no: 0,
            eligible,
        };
        assert!(tally(2, 4).agrees());
        assert!(tally(1, 2).agrees());
        assert!(!tally(1, 3).agrees());
        assert!(!tally(0, 1).agrees());
    }

    #[test]
    fn outcomes_route_to_channels() {
        let war = Outcome::War(WarBallotReport {
            house: HouseId::new("wolf"),
            closed_by: BallotClose::Quorum,
            eligible: 1,
            tally: vec![],
            verdict: WarVerdict::Peace,
        });
        assert_eq!(war.channel(), Channel::Overworld);
        assert_eq!(war.to_string(), "wolf has voted for peace");
    }
}
