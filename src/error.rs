use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::id::{HouseId, TileId};
use crate::model::{TruceChoice, WarChoice};

/// An expected business condition that stops an action.
///
/// The `Display` text is the reply shown to the player; a rejected action
/// never mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("you are not a registered player")]
    UnknownPlayer,
    #[error("you are not part of a house")]
    NotInHouse,
    #[error("you are already part of a house")]
    AlreadyInHouse,
    #[error("{0} is not a house")]
    UnknownHouse(String),
    #[error("{0} is not a castle")]
    NotACastle(TileId),
    #[error("{0} is not held by any house")]
    UnclaimedTile(TileId),
    #[error("your house owns this castle")]
    OwnTile,
    #[error("your house is not at war with {0}")]
    NotAtWar(HouseId),
    #[error("your house is already at war with {0}")]
    AlreadyAtWar(HouseId),
    #[error("a siege is in progress on that castle")]
    SiegeInProgress,
    #[error("there is no active siege on {0}")]
    NoActiveSiege(TileId),
    #[error("the siege on {tile} ends in {remaining}")]
    SiegeNotExpired { tile: TileId, remaining: String },
    #[error("number of troops must be a positive number")]
    InvalidTroops,
    #[error("you do not have {0} troops")]
    InsufficientTroops(u64),
    #[error("action must be ATTACK or DEFEND")]
    UnknownSide,
    #[error("you have already voted for {0}")]
    AlreadyVotedWar(WarChoice),
    #[error("you cannot vote for your own house")]
    OwnHouseVote,
    #[error("your choice is not recognized, please vote again")]
    UnknownWarChoice,
    #[error("you have already voted {choice} to a truce with {house}")]
    AlreadyVotedTruce { choice: TruceChoice, house: HouseId },
    #[error("you must vote YES or NO")]
    UnknownTruceChoice,
    #[error("no ballot is open for {0}")]
    NoOpenBallot(String),
    #[error("the ballot for {0} is still open")]
    BallotStillOpen(String),
    #[error("that action is no longer possible: {0}")]
    Stale(String),
    #[error("the realm is busy, try again")]
    Busy,
}

/// The store could not answer a query or accept a commit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure to apply an intent atomically.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The state an intent was computed against changed before commit.
    #[error("stale intent: {0}")]
    Stale(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for CommitError {
    fn from(err: sqlx::Error) -> Self {
        CommitError::Store(StoreError::Database(err))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

/// Unrecoverable engine failure. Business conditions never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Internal error of an action evaluation: either a reply-worthy rejection or
/// a store failure that must propagate.
#[derive(Debug, Error)]
pub(crate) enum ActionError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Store(#[from] StoreError),
}
