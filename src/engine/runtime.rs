//! The engine front door: locks, evaluates, commits.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::clock::Clock;
use super::locks::LockTable;
use super::random::RandomSource;
use super::{house, ledger, siege, truce, war};
use crate::config::EngineConfig;
use crate::error::{CommitError, ConfigError, EngineError, Rejection, StoreError};
use crate::id::{HouseId, TileId};
use crate::model::{
    Action, ActionKind, EntityKey, HousePair, Intent, Mutation, Outcome, Timestamp,
};
use crate::store::{CommitIntent, EntityStore};

/// What an action produced: the reply for the actor, and any resolutions it
/// triggered, for announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub reply: String,
    pub outcomes: Vec<Outcome>,
}

impl From<Intent> for Response {
    fn from(intent: Intent) -> Self {
        Self {
            reply: intent.reply,
            outcomes: intent.outcome.into_iter().collect(),
        }
    }
}

/// Runs actions and resolutions against a store.
///
/// There is no engine-wide lock: each evaluation holds only the entity keys
/// its intent writes, and the store lock is held for single reads and
/// commits.
pub struct Engine<S> {
    store: RwLock<S>,
    locks: LockTable,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn RandomSource>>,
    config: EngineConfig,
}

impl<S: EntityStore + CommitIntent> Engine<S> {
    pub fn new(
        config: EngineConfig,
        store: S,
        clock: Arc<dyn Clock>,
        rng: impl RandomSource + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: RwLock::new(store),
            locks: LockTable::new(),
            clock,
            rng: Mutex::new(Box::new(rng)),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Run `f` against a consistent view of the store.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let store = self.store.read();
        f(&*store)
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Evaluate and commit one player action.
    pub fn submit(&self, action: &Action) -> Result<Response, EngineError> {
        let now = self.now();
        let actor = &action.actor;
        tracing::debug!(player = %actor, action = ?action.kind, "action submitted");

        match &action.kind {
            ActionKind::Join { house: target } => {
                let keys = BTreeSet::from([EntityKey::Player(actor.clone())]);
                let intent =
                    self.execute(keys, |store| house::join(store, &self.config, actor, target))?;
                Ok(intent.into())
            }
            ActionKind::Balance => {
                let intent = self.read(|store| house::balance(store, actor))?;
                Ok(intent.into())
            }
            ActionKind::Siege { tile } => {
                let keys = BTreeSet::from([EntityKey::Tile(TileId::new(tile))]);
                let intent = self.execute(keys, |store| {
                    ledger::start_siege(store, &self.config, actor, tile, now)
                })?;
                Ok(intent.into())
            }
            ActionKind::Pledge { tile, troops, side } => {
                let keys = BTreeSet::from([
                    EntityKey::Tile(TileId::new(tile)),
                    EntityKey::Player(actor.clone()),
                ]);
                let intent = self.execute(keys, |store| {
                    ledger::pledge(store, actor, tile, troops, side, now)
                })?;
                Ok(intent.into())
            }
            ActionKind::War { choice } => {
                let keys = self
                    .house_of(action)?
                    .map(EntityKey::WarBallot)
                    .into_iter()
                    .collect();
                let intent = self.execute(keys, |store| {
                    war::cast_war_vote(store, &self.config, actor, choice, now)
                })?;
                let ballot = intent.mutations.iter().find_map(|m| match m {
                    Mutation::InsertWarVote { vote } => Some(vote.house.clone()),
                    _ => None,
                });
                let mut response = Response::from(intent);
                if let Some(house) = ballot {
                    response.outcomes.extend(self.resolve_war_ballot_if_due(&house)?);
                }
                Ok(response)
            }
            ActionKind::Truce {
                house: raw_target,
                choice,
            } => {
                let target = self.config.registry().resolve(raw_target).cloned();
                let keys = match (self.house_of(action)?, target) {
                    (Some(own), Some(target)) => {
                        BTreeSet::from([EntityKey::TruceBallot(HousePair::new(own, target))])
                    }
                    _ => BTreeSet::new(),
                };
                let intent = self.execute(keys, |store| {
                    truce::cast_truce_vote(store, &self.config, actor, raw_target, choice, now)
                })?;
                let ballot = intent.mutations.iter().find_map(|m| match m {
                    Mutation::InsertTruceVote { vote } => Some(vote.pair()),
                    _ => None,
                });
                let mut response = Response::from(intent);
                if let Some(pair) = ballot {
                    response.outcomes.extend(self.resolve_truce_ballot_if_due(&pair)?);
                }
                Ok(response)
            }
        }
    }

    /// Resolve the active siege on `tile`; rejected before expiry.
    pub fn resolve_siege(&self, tile: &TileId) -> Result<Intent, EngineError> {
        let now = self.now();
        let keys = BTreeSet::from([EntityKey::Tile(tile.clone())]);
        self.execute(keys, |store| {
            let mut rng = self.rng.lock();
            siege::resolve_siege(store, &self.config, tile, now, &mut **rng)
        })
    }

    pub fn resolve_war_ballot_if_due(
        &self,
        house: &HouseId,
    ) -> Result<Option<Outcome>, EngineError> {
        let now = self.now();
        let keys = BTreeSet::from([EntityKey::WarBallot(house.clone())]);
        let intent = self.execute(keys, |store| {
            match war::war_ballot_due(store, &self.config, house, now)? {
                Some(_) => war::resolve_war_ballot(store, &self.config, house, now),
                None => Ok(Intent::reply(String::new())),
            }
        })?;
        Ok(intent.outcome)
    }

    pub fn resolve_truce_ballot_if_due(
        &self,
        pair: &HousePair,
    ) -> Result<Option<Outcome>, EngineError> {
        let now = self.now();
        let keys = BTreeSet::from([EntityKey::TruceBallot(pair.clone())]);
        let intent = self.execute(keys, |store| {
            match truce::truce_ballot_due(store, &self.config, pair, now)? {
                Some(_) => truce::resolve_truce_ballot(store, &self.config, pair, now),
                None => Ok(Intent::reply(String::new())),
            }
        })?;
        Ok(intent.outcome)
    }

    fn house_of(&self, action: &Action) -> Result<Option<HouseId>, StoreError> {
        Ok(self
            .read(|store| store.player(&action.actor))?
            .and_then(|p| p.house))
    }

    /// Evaluate under the keys the intent writes, then commit.
    ///
    /// `keys` is a first guess. If the evaluated intent writes outside it, the
    /// locks are released and the union is taken before evaluating again, up
    /// to `max_lock_attempts` times.
    fn execute<F>(&self, mut keys: BTreeSet<EntityKey>, mut eval: F) -> Result<Intent, EngineError>
    where
        F: FnMut(&S) -> Result<Intent, StoreError>,
    {
        for attempt in 1..=self.config.max_lock_attempts {
            let held = self.locks.acquire(keys.clone());
            let intent = {
                let store = self.store.read();
                eval(&*store)?
            };

            let writes = intent.entity_keys();
            if !held.covers(&writes) {
                tracing::debug!(attempt, wanted = writes.len(), "widening lock set");
                keys.extend(writes);
                continue;
            }
            if intent.is_noop() {
                return Ok(intent);
            }

            let committed = self.store.write().commit(&intent);
            return match committed {
                Ok(()) => {
                    tracing::debug!(mutations = intent.mutations.len(), "intent committed");
                    Ok(intent)
                }
                Err(CommitError::Stale(reason)) => {
                    tracing::warn!(%reason, "stale intent discarded");
                    Ok(Intent::rejected(&Rejection::Stale(reason)))
                }
                Err(CommitError::Store(err)) => Err(err.into()),
            };
        }
        tracing::warn!(
            attempts = self.config.max_lock_attempts,
            "gave up acquiring locks"
        );
        Ok(Intent::rejected(&Rejection::Busy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::engine::random::ScriptedRandom;
    use crate::id::PlayerId;
    use crate::model::{SiegeVerdict, TruceVerdict, WarVerdict};
    use crate::scenario::Scenario;
    use crate::store::MemoryStore;

    fn engine(s: &Scenario, clock: &Arc<ManualClock>) -> Engine<MemoryStore> {
        Engine::new(
            s.config().clone(),
            s.store(),
            clock.clone(),
            ScriptedRandom::new([0.5, 0.5]),
        )
        .unwrap()
    }

    fn realm() -> Scenario {
        Scenario::new()
            .house("h1")
            .house("h2")
            .player("p1", "h1", 1_000)
            .player("p2", "h2", 300)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
    }

    #[test]
    fn siege_round_trip() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_hours(1)));
        let engine = engine(&realm(), &clock);

        let reply = engine.submit(&Action::siege("p1", "a10")).unwrap().reply;
        assert_eq!(reply, "you have initiated a siege on h2's castle at A10");
        engine.submit(&Action::pledge("p1", "a10", "500", "attack")).unwrap();
        engine.submit(&Action::pledge("p2", "a10", "300", "defend")).unwrap();

        let p1 = engine.read(|s| s.player(&PlayerId::new("p1"))).unwrap().unwrap();
        assert_eq!(p1.troops, 500);

        let early = engine.resolve_siege(&TileId::new("a10")).unwrap();
        assert!(early.is_noop());

        clock.advance_hours(6);
        let intent = engine.resolve_siege(&TileId::new("a10")).unwrap();
        match intent.outcome {
            Some(Outcome::Siege(report)) => assert_eq!(report.verdict, SiegeVerdict::AttackerWon),
            other => panic!("unexpected outcome {other:?}"),
        }
        let owner = engine.read(|s| s.tile_owner(&TileId::new("a10"))).unwrap();
        assert_eq!(owner, Some(HouseId::new("h1")));

        let again = engine.resolve_siege(&TileId::new("a10")).unwrap();
        assert!(again.is_noop());
        assert!(again.outcome.is_none());
    }

    #[test]
    fn last_war_vote_resolves_the_ballot() {
        let s = realm().war_vote("p2", "peace", Timestamp::from_hours(1));
        let clock = Arc::new(ManualClock::new(Timestamp::from_hours(1)));
        let engine = engine(&s, &clock);

        let response = engine.submit(&Action::war("p1", "peace")).unwrap();
        assert_eq!(response.reply, "your choice of peace was recorded");
        match response.outcomes.as_slice() {
            [Outcome::War(report)] => assert_eq!(report.verdict, WarVerdict::Peace),
            other => panic!("unexpected outcomes {other:?}"),
        }
        let votes = engine.read(|s| s.war_votes().count());
        // p2's vote belongs to h2's ballot and is still open.
        assert_eq!(votes, 1);
    }

    #[test]
    fn war_declaration_is_widened_over_both_ballots() {
        let s = realm()
            .house("h3")
            .player("c1", "h3", 10)
            .war_vote("p2", "h3", Timestamp::from_hours(1));
        let clock = Arc::new(ManualClock::new(Timestamp::from_hours(1)));
        let engine = engine(&s, &clock);

        let response = engine.submit(&Action::war("c1", "h2")).unwrap();
        match response.outcomes.as_slice() {
            [Outcome::War(report)] => {
                assert_eq!(report.verdict, WarVerdict::WarDeclared(HouseId::new("h2")))
            }
            other => panic!("unexpected outcomes {other:?}"),
        }
        assert_eq!(engine.read(|s| s.war_votes().count()), 0);
        assert!(
            engine
                .read(|s| s.war_exists(&HouseId::new("h2"), &HouseId::new("h3")))
                .unwrap()
        );
    }

    #[test]
    fn truce_quorum_ends_the_war() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_hours(1)));
        let engine = engine(&realm(), &clock);

        let first = engine.submit(&Action::truce("p1", "h2", "yes")).unwrap();
        assert!(first.outcomes.is_empty());
        let second = engine.submit(&Action::truce("p2", "h1", "yes")).unwrap();
        match second.outcomes.as_slice() {
            [Outcome::Truce(report)] => assert_eq!(report.verdict, TruceVerdict::Agreed),
            other => panic!("unexpected outcomes {other:?}"),
        }
        assert!(
            !engine
                .read(|s| s.war_exists(&HouseId::new("h1"), &HouseId::new("h2")))
                .unwrap()
        );
    }

    #[test]
    fn invalid_config_is_refused() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let result = Engine::new(
            EngineConfig::default(),
            MemoryStore::new(),
            clock,
            ScriptedRandom::new([0.0]),
        );
        assert!(result.is_err());
    }
}
