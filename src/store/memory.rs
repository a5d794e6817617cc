use std::collections::{BTreeMap, BTreeSet};

use super::{CommitIntent, EntityStore};
use crate::error::{CommitError, StoreError};
use crate::id::{HouseId, IdGenerator, PlayerId, PledgeId, SiegeId, TileId};
use crate::model::{
    HousePair, Intent, Mutation, Player, Pledge, Siege, SiegeState, Tile, TruceVote, Vote,
    VoteType, WarVote,
};

/// In-memory game state implementing the full store contract.
///
/// Keyed collections enforce the uniqueness invariants structurally: one war
/// per pair, one war vote per voter, one truce vote per (voter, pair).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tiles: BTreeMap<TileId, Tile>,
    players: BTreeMap<PlayerId, Player>,
    sieges: BTreeMap<SiegeId, Siege>,
    pledges: BTreeMap<PledgeId, Pledge>,
    wars: BTreeSet<HousePair>,
    war_votes: BTreeMap<PlayerId, WarVote>,
    truce_votes: BTreeMap<(PlayerId, HousePair), TruceVote>,
    id_gen: IdGenerator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Seeding (scenario setup and loading from durable storage) --

    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.id.clone(), tile);
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn insert_war(&mut self, pair: HousePair) {
        self.wars.insert(pair);
    }

    pub fn remove_war(&mut self, pair: &HousePair) -> bool {
        self.wars.remove(pair)
    }

    /// Insert a siege with its existing id.
    pub fn insert_siege(&mut self, siege: Siege) {
        self.id_gen.observe(siege.id.0);
        self.sieges.insert(siege.id, siege);
    }

    /// Insert a pledge with its existing id.
    pub fn insert_pledge(&mut self, pledge: Pledge) {
        self.id_gen.observe(pledge.id.0);
        self.pledges.insert(pledge.id, pledge);
    }

    pub fn insert_war_vote(&mut self, vote: WarVote) {
        self.war_votes.insert(vote.voter.clone(), vote);
    }

    pub fn insert_truce_vote(&mut self, vote: TruceVote) {
        self.truce_votes
            .insert((vote.voter.clone(), vote.pair()), vote);
    }

    // -- Snapshot access --

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn sieges(&self) -> impl Iterator<Item = &Siege> {
        self.sieges.values()
    }

    pub fn pledges(&self) -> impl Iterator<Item = &Pledge> {
        self.pledges.values()
    }

    pub fn wars(&self) -> impl Iterator<Item = &HousePair> {
        self.wars.iter()
    }

    pub fn war_votes(&self) -> impl Iterator<Item = &WarVote> {
        self.war_votes.values()
    }

    pub fn truce_votes(&self) -> impl Iterator<Item = &TruceVote> {
        self.truce_votes.values()
    }

    fn active_siege_on(&self, tile: &TileId) -> Option<&Siege> {
        self.sieges
            .values()
            .find(|s| &s.tile == tile && s.is_active())
    }

    fn is_member(&self, player: &PlayerId, house: &HouseId) -> bool {
        self.players
            .get(player)
            .is_some_and(|p| p.is_member_of(house))
    }

    /// Check that a mutation can apply to the current state.
    fn check(&self, mutation: &Mutation) -> Result<(), String> {
        match mutation {
            Mutation::SetPlayerHouse { player, .. } => match self.players.get(player) {
                None => Err(format!("player {player} does not exist")),
                Some(p) if p.house.is_some() => Err(format!("{player} already joined a house")),
                Some(_) => Ok(()),
            },
            Mutation::SpendTroops { player, troops } => match self.players.get(player) {
                None => Err(format!("player {player} does not exist")),
                Some(p) if p.troops < *troops => {
                    Err(format!("{player} no longer has {troops} troops"))
                }
                Some(_) => Ok(()),
            },
            Mutation::AdjustPlayer { player, .. } => {
                if self.players.contains_key(player) {
                    Ok(())
                } else {
                    Err(format!("player {player} does not exist"))
                }
            }
            Mutation::SetTileOwner { tile, .. } => {
                if self.tiles.contains_key(tile) {
                    Ok(())
                } else {
                    Err(format!("tile {tile} does not exist"))
                }
            }
            Mutation::InsertSiege { tile, .. } => {
                if !self.tiles.contains_key(tile) {
                    Err(format!("tile {tile} does not exist"))
                } else if self.active_siege_on(tile).is_some() {
                    Err(format!("a siege is already active on {tile}"))
                } else {
                    Ok(())
                }
            }
            Mutation::RemoveSiege { siege, tile } | Mutation::RemovePledges { siege, tile } => {
                match self.sieges.get(siege) {
                    Some(s) if s.is_active() && &s.tile == tile => Ok(()),
                    _ => Err(format!("siege {siege} on {tile} is no longer active")),
                }
            }
            Mutation::InsertPledge { siege, tile, .. } => match self.sieges.get(siege) {
                Some(s) if s.is_active() && &s.tile == tile => Ok(()),
                _ => Err(format!("the siege on {tile} has ended")),
            },
            Mutation::InsertWar { pair } => {
                if self.wars.contains(pair) {
                    Err(format!("{pair} are already at war"))
                } else {
                    Ok(())
                }
            }
            Mutation::RemoveWar { pair } => {
                if self.wars.contains(pair) {
                    Ok(())
                } else {
                    Err(format!("{pair} are not at war"))
                }
            }
            Mutation::InsertWarVote { vote } => {
                if self.war_votes.contains_key(&vote.voter) {
                    Err(format!("{} already voted", vote.voter))
                } else {
                    Ok(())
                }
            }
            Mutation::InsertTruceVote { vote } => {
                let pair = vote.pair();
                if self.truce_votes.contains_key(&(vote.voter.clone(), pair.clone())) {
                    Err(format!("{} already voted on this truce", vote.voter))
                } else if !self.wars.contains(&pair) {
                    Err(format!("{pair} are not at war"))
                } else {
                    Ok(())
                }
            }
            Mutation::RemoveWarVotes { .. } | Mutation::RemoveTruceVotes { .. } => Ok(()),
        }
    }

    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::SetPlayerHouse { player, house } => {
                if let Some(p) = self.players.get_mut(player) {
                    p.house = Some(house.clone());
                }
            }
            Mutation::SpendTroops { player, troops } => {
                if let Some(p) = self.players.get_mut(player) {
                    p.troops -= troops;
                }
            }
            Mutation::AdjustPlayer {
                player,
                troops,
                money,
            } => {
                if let Some(p) = self.players.get_mut(player) {
                    p.troops = p.troops.saturating_add_signed(*troops);
                    p.money = p.money.saturating_add_signed(*money);
                }
            }
            Mutation::SetTileOwner { tile, owner } => {
                if let Some(t) = self.tiles.get_mut(tile) {
                    t.owner = owner.clone();
                }
            }
            Mutation::InsertSiege {
                tile,
                attacker,
                created_at,
                expires_at,
            } => {
                let id = SiegeId(self.id_gen.next_id());
                self.sieges.insert(
                    id,
                    Siege {
                        id,
                        tile: tile.clone(),
                        attacker: attacker.clone(),
                        created_at: *created_at,
                        expires_at: *expires_at,
                        state: SiegeState::Active,
                    },
                );
            }
            Mutation::RemoveSiege { siege, .. } => {
                // Resolved sieges are dropped, not kept around.
                self.sieges.remove(siege);
            }
            Mutation::InsertPledge {
                siege,
                player,
                troops,
                side,
                pledged_at,
                ..
            } => {
                let id = PledgeId(self.id_gen.next_id());
                self.pledges.insert(
                    id,
                    Pledge {
                        id,
                        siege: *siege,
                        player: player.clone(),
                        troops: *troops,
                        side: *side,
                        pledged_at: *pledged_at,
                    },
                );
            }
            Mutation::RemovePledges { siege, .. } => {
                self.pledges.retain(|_, p| p.siege != *siege);
            }
            Mutation::InsertWar { pair } => {
                self.wars.insert(pair.clone());
            }
            Mutation::RemoveWar { pair } => {
                self.wars.remove(pair);
            }
            Mutation::InsertWarVote { vote } => {
                self.war_votes.insert(vote.voter.clone(), vote.clone());
            }
            Mutation::RemoveWarVotes { voters, .. } => {
                for voter in voters {
                    self.war_votes.remove(voter);
                }
            }
            Mutation::InsertTruceVote { vote } => {
                self.insert_truce_vote(vote.clone());
            }
            Mutation::RemoveTruceVotes { pair } => {
                self.truce_votes.retain(|(_, p), _| p != pair);
            }
        }
    }
}

impl CommitIntent for MemoryStore {
    fn commit(&mut self, intent: &Intent) -> Result<(), CommitError> {
        // Mutations of one intent never depend on each other, so every check
        // runs against the pre-commit state.
        for mutation in &intent.mutations {
            self.check(mutation).map_err(CommitError::Stale)?;
        }
        for mutation in &intent.mutations {
            self.apply(mutation);
        }
        Ok(())
    }
}

impl EntityStore for MemoryStore {
    fn tile(&self, tile: &TileId) -> Result<Option<Tile>, StoreError> {
        Ok(self.tiles.get(tile).cloned())
    }

    fn player(&self, player: &PlayerId) -> Result<Option<Player>, StoreError> {
        Ok(self.players.get(player).cloned())
    }

    fn house_members(&self, house: &HouseId) -> Result<Vec<Player>, StoreError> {
        Ok(self
            .players
            .values()
            .filter(|p| p.is_member_of(house))
            .cloned()
            .collect())
    }

    fn siege(&self, siege: SiegeId) -> Result<Option<Siege>, StoreError> {
        Ok(self.sieges.get(&siege).cloned())
    }

    fn active_siege(&self, tile: &TileId) -> Result<Option<Siege>, StoreError> {
        Ok(self.active_siege_on(tile).cloned())
    }

    fn active_sieges(&self) -> Result<Vec<Siege>, StoreError> {
        Ok(self
            .sieges
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect())
    }

    fn pledges_for_siege(&self, siege: SiegeId) -> Result<Vec<Pledge>, StoreError> {
        Ok(self
            .pledges
            .values()
            .filter(|p| p.siege == siege)
            .cloned()
            .collect())
    }

    fn pledges_for_player(&self, player: &PlayerId) -> Result<Vec<Pledge>, StoreError> {
        Ok(self
            .pledges
            .values()
            .filter(|p| &p.player == player)
            .cloned()
            .collect())
    }

    fn war_exists(&self, a: &HouseId, b: &HouseId) -> Result<bool, StoreError> {
        Ok(self.wars.contains(&HousePair::of(a, b)))
    }

    fn votes_by_voter_and_type(
        &self,
        voter: &PlayerId,
        kind: VoteType,
    ) -> Result<Vec<Vote>, StoreError> {
        let votes = match kind {
            VoteType::War => self
                .war_votes
                .get(voter)
                .cloned()
                .map(Vote::War)
                .into_iter()
                .collect(),
            VoteType::Truce => self
                .truce_votes
                .iter()
                .filter(|((v, _), _)| v == voter)
                .map(|(_, vote)| Vote::Truce(vote.clone()))
                .collect(),
        };
        Ok(votes)
    }

    fn war_votes_for_house(&self, house: &HouseId) -> Result<Vec<WarVote>, StoreError> {
        Ok(self
            .war_votes
            .values()
            .filter(|v| self.is_member(&v.voter, house))
            .cloned()
            .collect())
    }

    fn war_ballot_houses(&self) -> Result<Vec<HouseId>, StoreError> {
        let houses: BTreeSet<HouseId> = self
            .war_votes
            .values()
            .filter_map(|v| self.players.get(&v.voter).and_then(|p| p.house.clone()))
            .collect();
        Ok(houses.into_iter().collect())
    }

    fn truce_votes_for_pair(&self, pair: &HousePair) -> Result<Vec<TruceVote>, StoreError> {
        Ok(self
            .truce_votes
            .iter()
            .filter(|((_, p), _)| p == pair)
            .map(|(_, vote)| vote.clone())
            .collect())
    }

    fn truce_ballot_pairs(&self) -> Result<Vec<HousePair>, StoreError> {
        let pairs: BTreeSet<HousePair> = self.truce_votes.keys().map(|(_, p)| p.clone()).collect();
        Ok(pairs.into_iter().collect())
    }
}
