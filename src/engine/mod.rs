//! The conflict-resolution engine.
//!
//! Every operation in [`ledger`], [`siege`], [`war`], [`truce`] and [`house`]
//! is a pure function of (store, action, time, randomness) returning an
//! [`Intent`]. [`Engine`] adds locking and commits; [`ResolutionScheduler`]
//! drives resolutions as their deadlines pass.

pub mod apportion;
pub mod clock;
pub mod house;
pub mod ledger;
pub mod locks;
pub mod random;
pub mod runtime;
pub mod scheduler;
pub mod siege;
pub mod truce;
pub mod war;

pub use clock::{Clock, ManualClock, SystemClock};
pub use locks::{LockSet, LockTable};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use runtime::{Engine, Response};
pub use scheduler::ResolutionScheduler;

use crate::error::{ActionError, Rejection, StoreError};
use crate::id::PlayerId;
use crate::model::{Intent, Player};
use crate::store::EntityStore;

/// Turn a rejection into a reply-only intent; store failures propagate.
pub(crate) fn settle(result: Result<Intent, ActionError>) -> Result<Intent, StoreError> {
    match result {
        Ok(intent) => Ok(intent),
        Err(ActionError::Rejected(rejection)) => {
            tracing::debug!(%rejection, "action rejected");
            Ok(Intent::rejected(&rejection))
        }
        Err(ActionError::Store(err)) => Err(err),
    }
}

pub(crate) fn require_player(
    store: &dyn EntityStore,
    player: &PlayerId,
) -> Result<Player, ActionError> {
    Ok(store.player(player)?.ok_or(Rejection::UnknownPlayer)?)
}
