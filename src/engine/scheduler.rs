use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::runtime::Engine;
use crate::error::EngineError;
use crate::model::Outcome;
use crate::store::{CommitIntent, EntityStore};

/// Drives time-based resolutions: expired sieges and ballots whose voting
/// window has closed.
///
/// Each pass is idempotent. A resolution that an action or another pass
/// already committed is found gone (or stale at commit) and skipped, so a
/// siege or ballot is never resolved twice.
pub struct ResolutionScheduler<S> {
    engine: Arc<Engine<S>>,
}

impl<S: EntityStore + CommitIntent> ResolutionScheduler<S> {
    pub fn new(engine: Arc<Engine<S>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine<S>> {
        &self.engine
    }

    /// Resolve everything that is due at the engine clock's current time.
    pub fn tick(&self) -> Result<Vec<Outcome>, EngineError> {
        let now = self.engine.now();
        let mut outcomes = Vec::new();

        let expired: Vec<_> = self
            .engine
            .read(|store| store.active_sieges())?
            .into_iter()
            .filter(|s| s.is_expired(now))
            .collect();
        for siege in expired {
            let intent = self.engine.resolve_siege(&siege.tile)?;
            outcomes.extend(intent.outcome);
        }

        for house in self.engine.read(|store| store.war_ballot_houses())? {
            outcomes.extend(self.engine.resolve_war_ballot_if_due(&house)?);
        }
        for pair in self.engine.read(|store| store.truce_ballot_pairs())? {
            outcomes.extend(self.engine.resolve_truce_ballot_if_due(&pair)?);
        }

        if !outcomes.is_empty() {
            tracing::info!(resolved = outcomes.len(), %now, "scheduler pass");
        }
        Ok(outcomes)
    }

    /// Tick every `scheduler_interval_secs` until `stop` is set, handing each
    /// outcome to `on_outcome`. Store failures end the loop.
    pub fn run(
        &self,
        stop: &AtomicBool,
        mut on_outcome: impl FnMut(Outcome),
    ) -> Result<(), EngineError> {
        let interval = Duration::from_secs(self.engine.config().scheduler_interval_secs);
        tracing::info!(interval_secs = interval.as_secs(), "resolution scheduler started");
        while !stop.load(Ordering::Relaxed) {
            for outcome in self.tick()? {
                on_outcome(outcome);
            }
            thread::sleep(interval);
        }
        tracing::info!("resolution scheduler stopped");
        Ok(())
    }
}
