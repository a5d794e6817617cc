#[macro_use]
mod macros;

pub mod action;
pub mod intent;
pub mod player;
pub mod report;
pub mod siege;
pub mod timestamp;
pub mod vote;
pub mod war;

pub use action::{Action, ActionKind};
pub use intent::{EntityKey, Intent, Mutation};
pub use player::{Player, Tile};
pub use report::{
    BallotClose, Channel, ChoiceCount, HouseTally, Outcome, PlayerShare, SiegeReport,
    SiegeVerdict, TruceBallotReport, TruceVerdict, WarBallotReport, WarVerdict,
};
pub use siege::{Pledge, Side, Siege, SiegeState};
pub use timestamp::Timestamp;
pub use vote::{TruceChoice, TruceVote, Vote, VoteType, WarChoice, WarVote};
pub use war::HousePair;
