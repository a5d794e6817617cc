//! Builder for game states used by tests and demos.
//!
//! Seeds a [`MemoryStore`] directly, bypassing the engine's preconditions, so
//! a test can start from any state: a siege already running, half a ballot
//! already cast. Misuse (a pledge on a tile without a siege, a vote by a
//! houseless player) panics.

use std::sync::Arc;

use crate::config::{AtWarVotePolicy, EngineConfig, HouseConfig};
use crate::engine::{Clock, Engine, RandomSource};
use crate::error::ConfigError;
use crate::id::{HouseId, IdGenerator, PlayerId, PledgeId, SiegeId, TileId};
use crate::model::{
    HousePair, Player, Pledge, Side, Siege, SiegeState, Tile, Timestamp, TruceChoice, TruceVote,
    WarChoice, WarVote,
};
use crate::store::{EntityStore, MemoryStore};

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    config: EngineConfig,
    store: MemoryStore,
    ids: IdGenerator,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// A house whose display name is its id.
    pub fn house(self, id: &str) -> Self {
        self.house_named(id, id)
    }

    pub fn house_named(mut self, id: &str, name: &str) -> Self {
        self.config.houses.push(HouseConfig::new(id, name));
        self
    }

    pub fn house_alias(mut self, id: &str, alias: &str) -> Self {
        let house = self
            .config
            .houses
            .iter_mut()
            .find(|h| h.id.as_str() == id)
            .unwrap_or_else(|| panic!("house {id} is not configured"));
        house.aliases.push(alias.to_string());
        self
    }

    /// A player with `troops`; an empty `house` leaves them houseless.
    pub fn player(mut self, id: &str, house: &str, troops: u64) -> Self {
        let mut player = Player::new(id);
        player.house = (!house.is_empty()).then(|| HouseId::new(house));
        player.troops = troops;
        self.store.insert_player(player);
        self
    }

    /// Escape hatch: edit a player already added.
    pub fn with_player(mut self, id: &str, f: impl FnOnce(&mut Player)) -> Self {
        let mut player = self.existing_player(id);
        f(&mut player);
        self.store.insert_player(player);
        self
    }

    pub fn tile(mut self, id: &str, owner: Option<&str>) -> Self {
        self.store.insert_tile(Tile {
            id: TileId::new(id),
            owner: owner.map(HouseId::new),
        });
        self
    }

    pub fn war(mut self, a: &str, b: &str) -> Self {
        self.store
            .insert_war(HousePair::new(HouseId::new(a), HouseId::new(b)));
        self
    }

    /// An active siege on `tile` expiring after the configured duration.
    pub fn siege(mut self, tile: &str, attacker: &str, created_at: Timestamp) -> Self {
        let id = SiegeId(self.ids.next_id());
        self.store.insert_siege(Siege {
            id,
            tile: TileId::new(tile),
            attacker: HouseId::new(attacker),
            created_at,
            expires_at: created_at.plus_hours(self.config.siege_duration_hours),
            state: SiegeState::Active,
        });
        self
    }

    /// A pledge on the active siege of `tile`. The player's troops are left
    /// as they are.
    pub fn pledge(
        mut self,
        tile: &str,
        player: &str,
        troops: u64,
        side: Side,
        pledged_at: Timestamp,
    ) -> Self {
        let tile = TileId::new(tile);
        let siege = self
            .store
            .active_siege(&tile)
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("no active siege on {tile}"));
        let id = PledgeId(self.ids.next_id());
        self.store.insert_pledge(Pledge {
            id,
            siege: siege.id,
            player: PlayerId::new(player),
            troops,
            side,
            pledged_at,
        });
        self
    }

    /// A war vote; `choice` is `peace` or a house id.
    pub fn war_vote(mut self, voter: &str, choice: &str, cast_at: Timestamp) -> Self {
        let house = self.house_of(voter);
        self.store.insert_war_vote(WarVote {
            voter: PlayerId::new(voter),
            house,
            choice: WarChoice::from_key(choice),
            cast_at,
        });
        self
    }

    pub fn truce_vote(
        mut self,
        voter: &str,
        target: &str,
        choice: TruceChoice,
        cast_at: Timestamp,
    ) -> Self {
        let house = self.house_of(voter);
        self.store.insert_truce_vote(TruceVote {
            voter: PlayerId::new(voter),
            house,
            target: HouseId::new(target),
            choice,
            cast_at,
        });
        self
    }

    pub fn at_war_vote_policy(mut self, policy: AtWarVotePolicy) -> Self {
        self.config.at_war_vote_policy = policy;
        self
    }

    /// Escape hatch: edit the engine config.
    pub fn configure(mut self, f: impl FnOnce(&mut EngineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A copy of the seeded store.
    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }

    pub fn into_parts(self) -> (EngineConfig, MemoryStore) {
        (self.config, self.store)
    }

    /// An engine over this state.
    pub fn engine(
        self,
        clock: Arc<dyn Clock>,
        rng: impl RandomSource + 'static,
    ) -> Result<Engine<MemoryStore>, ConfigError> {
        Engine::new(self.config, self.store, clock, rng)
    }

    fn existing_player(&self, id: &str) -> Player {
        self.store
            .player(&PlayerId::new(id))
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("player {id} was not added"))
    }

    fn house_of(&self, voter: &str) -> HouseId {
        self.existing_player(voter)
            .house
            .unwrap_or_else(|| panic!("voter {voter} has no house"))
    }
}
