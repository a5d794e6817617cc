//! Joining a house, and the read-only account summary.

use std::fmt::Write as _;

use super::{require_player, settle};
use crate::config::EngineConfig;
use crate::error::{ActionError, Rejection, StoreError};
use crate::id::PlayerId;
use crate::model::{Intent, Mutation};
use crate::store::EntityStore;

/// A houseless player joins a configured house. Membership is permanent.
pub fn join(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    house: &str,
) -> Result<Intent, StoreError> {
    settle(try_join(store, config, actor, house))
}

fn try_join(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    house: &str,
) -> Result<Intent, ActionError> {
    let player = require_player(store, actor)?;
    if player.house.is_some() {
        return Err(Rejection::AlreadyInHouse.into());
    }
    let registry = config.registry();
    let house = registry
        .resolve(house)
        .cloned()
        .ok_or_else(|| Rejection::UnknownHouse(house.trim().to_string()))?;
    let name = registry.name_of(&house).unwrap_or(house.as_str()).to_string();

    tracing::info!(player = %actor, house = %house, "player joined house");
    Ok(
        Intent::reply(format!("you successfully joined {name}!")).with(
            Mutation::SetPlayerHouse {
                player: actor.clone(),
                house,
            },
        ),
    )
}

/// The actor's resources and outstanding siege contributions.
pub fn balance(store: &dyn EntityStore, actor: &PlayerId) -> Result<Intent, StoreError> {
    settle(try_balance(store, actor))
}

fn try_balance(store: &dyn EntityStore, actor: &PlayerId) -> Result<Intent, ActionError> {
    let player = require_player(store, actor)?;
    let mut reply = format!(
        "your account: {} money, {} troops, {} ships\n\nsiege contributions:\n",
        player.money, player.troops, player.ships
    );

    let mut pledges = store.pledges_for_player(actor)?;
    pledges.sort_by_key(|p| (p.pledged_at, p.id));
    let mut listed = 0;
    for pledge in pledges {
        // Pledges of a siege being removed may briefly outlive it.
        let Some(siege) = store.siege(pledge.siege)? else {
            continue;
        };
        let _ = writeln!(reply, "{} {} troops {}", siege.tile, pledge.troops, pledge.side);
        listed += 1;
    }
    if listed == 0 {
        reply.push_str("none");
    }
    Ok(Intent::reply(reply.trim_end().to_string()))
}
