//! Starting sieges and recording pledges against them.

use super::{require_player, settle};
use crate::config::EngineConfig;
use crate::error::{ActionError, Rejection, StoreError};
use crate::id::{PlayerId, TileId};
use crate::model::{Intent, Mutation, Side, Timestamp};
use crate::store::EntityStore;

/// Start a siege on `tile` for the actor's house.
///
/// The tile must be owned by a house the actor's house is at war with, and
/// carry no active siege. The siege expires after the configured duration.
pub fn start_siege(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    tile: &str,
    now: Timestamp,
) -> Result<Intent, StoreError> {
    settle(try_start_siege(store, config, actor, tile, now))
}

fn try_start_siege(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    tile: &str,
    now: Timestamp,
) -> Result<Intent, ActionError> {
    let tile_id = TileId::new(tile);
    let player = require_player(store, actor)?;
    let tile = store
        .tile(&tile_id)?
        .ok_or_else(|| Rejection::NotACastle(tile_id.clone()))?;
    let owner = tile
        .owner
        .ok_or_else(|| Rejection::UnclaimedTile(tile_id.clone()))?;
    let house = player.house.ok_or(Rejection::NotInHouse)?;

    if house == owner {
        return Err(Rejection::OwnTile.into());
    }
    if !store.war_exists(&house, &owner)? {
        return Err(Rejection::NotAtWar(owner).into());
    }
    if store.active_siege(&tile_id)?.is_some() {
        return Err(Rejection::SiegeInProgress.into());
    }

    let expires_at = now.plus_hours(config.siege_duration_hours);
    tracing::info!(tile = %tile_id, attacker = %house, defender = %owner, "siege started");
    Ok(Intent::reply(format!(
        "you have initiated a siege on {owner}'s castle at {tile_id}"
    ))
    .with(Mutation::InsertSiege {
        tile: tile_id,
        attacker: house,
        created_at: now,
        expires_at,
    }))
}

/// Commit troops to one side of the active siege on `tile`.
///
/// Troops leave the player's count immediately and are never returned by
/// un-pledging; only the siege's resolution adjusts them again.
pub fn pledge(
    store: &dyn EntityStore,
    actor: &PlayerId,
    tile: &str,
    troops: &str,
    side: &str,
    now: Timestamp,
) -> Result<Intent, StoreError> {
    settle(try_pledge(store, actor, tile, troops, side, now))
}

fn try_pledge(
    store: &dyn EntityStore,
    actor: &PlayerId,
    tile: &str,
    troops: &str,
    side: &str,
    now: Timestamp,
) -> Result<Intent, ActionError> {
    let tile_id = TileId::new(tile);
    let player = require_player(store, actor)?;
    if store.tile(&tile_id)?.is_none() {
        return Err(Rejection::NotACastle(tile_id).into());
    }
    let troops = parse_troops(troops)?;
    if troops > player.troops {
        return Err(Rejection::InsufficientTroops(troops).into());
    }
    let side: Side = side.parse()?;
    let siege = store
        .active_siege(&tile_id)?
        .ok_or_else(|| Rejection::NoActiveSiege(tile_id.clone()))?;

    Ok(Intent::reply(format!(
        "you successfully pledged {troops} troops to {side} {tile_id}"
    ))
    .with(Mutation::SpendTroops {
        player: actor.clone(),
        troops,
    })
    .with(Mutation::InsertPledge {
        siege: siege.id,
        tile: tile_id,
        player: actor.clone(),
        troops,
        side,
        pledged_at: now,
    }))
}

/// A troop count must be a positive whole number.
fn parse_troops(raw: &str) -> Result<u64, Rejection> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Rejection::InvalidTroops),
    }
}
