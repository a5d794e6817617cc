use sqlx::PgPool;

use super::from_db;
use crate::error::StoreError;
use crate::id::{HouseId, PlayerId, PledgeId, SiegeId, TileId};
use crate::model::{
    HousePair, Player, Pledge, Side, Siege, SiegeState, Tile, Timestamp, TruceChoice, TruceVote,
    WarChoice, WarVote,
};
use crate::store::MemoryStore;

/// Read every table into a fresh [`MemoryStore`].
pub async fn fetch_store(pool: &PgPool) -> Result<MemoryStore, StoreError> {
    let mut store = MemoryStore::new();

    let tiles: Vec<(String, Option<String>)> = sqlx::query_as("SELECT id, owner FROM tiles")
        .fetch_all(pool)
        .await?;
    for (id, owner) in tiles {
        store.insert_tile(Tile {
            id: TileId::new(&id),
            owner: owner.map(HouseId::new),
        });
    }

    let players: Vec<(String, Option<String>, i64, i64, i64)> =
        sqlx::query_as("SELECT id, house, troops, ships, money FROM players")
            .fetch_all(pool)
            .await?;
    for (id, house, troops, ships, money) in players {
        let mut player = Player::new(PlayerId::new(id));
        player.house = house.map(HouseId::new);
        player.troops = from_db(troops);
        player.ships = from_db(ships);
        player.money = from_db(money);
        store.insert_player(player);
    }

    let sieges: Vec<(i64, String, String, i64, i64, String)> = sqlx::query_as(
        "SELECT id, tile, attacker, created_at, expires_at, state FROM sieges ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    for (id, tile, attacker, created_at, expires_at, state) in sieges {
        store.insert_siege(Siege {
            id: SiegeId(from_db(id)),
            tile: TileId::new(&tile),
            attacker: HouseId::new(attacker),
            created_at: millis(created_at),
            expires_at: millis(expires_at),
            state: SiegeState::try_from(state.as_str()).map_err(StoreError::Corrupt)?,
        });
    }

    let pledges: Vec<(i64, i64, String, i64, String, i64)> = sqlx::query_as(
        "SELECT id, siege, player, troops, side, pledged_at FROM pledges ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    for (id, siege, player, troops, side, pledged_at) in pledges {
        store.insert_pledge(Pledge {
            id: PledgeId(from_db(id)),
            siege: SiegeId(from_db(siege)),
            player: PlayerId::new(player),
            troops: from_db(troops),
            side: Side::try_from(side.as_str()).map_err(StoreError::Corrupt)?,
            pledged_at: millis(pledged_at),
        });
    }

    let wars: Vec<(String, String)> = sqlx::query_as("SELECT house_a, house_b FROM wars")
        .fetch_all(pool)
        .await?;
    for (a, b) in wars {
        store.insert_war(HousePair::new(HouseId::new(a), HouseId::new(b)));
    }

    let war_votes: Vec<(String, String, String, i64)> =
        sqlx::query_as("SELECT voter, house, choice, cast_at FROM war_votes")
            .fetch_all(pool)
            .await?;
    for (voter, house, choice, cast_at) in war_votes {
        store.insert_war_vote(WarVote {
            voter: PlayerId::new(voter),
            house: HouseId::new(house),
            choice: WarChoice::from_key(&choice),
            cast_at: millis(cast_at),
        });
    }

    let truce_votes: Vec<(String, String, String, String, i64)> =
        sqlx::query_as("SELECT voter, house, target, choice, cast_at FROM truce_votes")
            .fetch_all(pool)
            .await?;
    for (voter, house, target, choice, cast_at) in truce_votes {
        store.insert_truce_vote(TruceVote {
            voter: PlayerId::new(voter),
            house: HouseId::new(house),
            target: HouseId::new(target),
            choice: TruceChoice::try_from(choice.as_str()).map_err(StoreError::Corrupt)?,
            cast_at: millis(cast_at),
        });
    }

    tracing::info!(
        players = store.players().count(),
        sieges = store.sieges().count(),
        wars = store.wars().count(),
        "snapshot fetched from postgres"
    );
    Ok(store)
}

fn millis(value: i64) -> Timestamp {
    Timestamp::from_millis(from_db(value))
}
