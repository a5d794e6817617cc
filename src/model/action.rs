//! Player actions accepted by the engine.
//!
//! Command parsing splits a chat message into raw arguments; the engine
//! validates them, so malformed input is reported rather than rejected
//! upstream.

use serde::Serialize;

use crate::id::PlayerId;

#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub actor: PlayerId,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Join a house by id, name, or alias.
    Join { house: String },
    /// Show resources and outstanding siege contributions.
    Balance,
    /// Start a siege on a tile owned by an enemy house.
    Siege { tile: String },
    /// Commit troops to one side of the active siege on a tile.
    Pledge {
        tile: String,
        troops: String,
        side: String,
    },
    /// Vote in the house war ballot for a house or `peace`.
    War { choice: String },
    /// Vote YES or NO on a truce with a house at war with the voter's house.
    Truce { house: String, choice: String },
}

impl Action {
    pub fn new(actor: impl Into<PlayerId>, kind: ActionKind) -> Self {
        Self {
            actor: actor.into(),
            kind,
        }
    }

    pub fn join(actor: impl Into<PlayerId>, house: &str) -> Self {
        Self::new(
            actor,
            ActionKind::Join {
                house: house.to_string(),
            },
        )
    }

    pub fn balance(actor: impl Into<PlayerId>) -> Self {
        Self::new(actor, ActionKind::Balance)
    }

    pub fn siege(actor: impl Into<PlayerId>, tile: &str) -> Self {
        Self::new(
            actor,
            ActionKind::Siege {
                tile: tile.to_string(),
            },
        )
    }

    pub fn pledge(actor: impl Into<PlayerId>, tile: &str, troops: &str, side: &str) -> Self {
        Self::new(
            actor,
            ActionKind::Pledge {
                tile: tile.to_string(),
                troops: troops.to_string(),
                side: side.to_string(),
            },
        )
    }

    pub fn war(actor: impl Into<PlayerId>, choice: &str) -> Self {
        Self::new(
            actor,
            ActionKind::War {
                choice: choice.to_string(),
            },
        )
    }

    pub fn truce(actor: impl Into<PlayerId>, house: &str, choice: &str) -> Self {
        Self::new(
            actor,
            ActionKind::Truce {
                house: house.to_string(),
                choice: choice.to_string(),
            },
        )
    }
}
