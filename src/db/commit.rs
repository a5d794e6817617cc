use sqlx::postgres::PgQueryResult;
use sqlx::{PgConnection, PgPool};

use super::to_db;
use crate::error::CommitError;
use crate::id::{SiegeId, TileId};
use crate::model::{Intent, Mutation};

/// Apply an intent in one transaction.
///
/// Each statement carries the precondition its mutation relies on in its
/// WHERE clause; a statement that touches no row rolls the whole intent back
/// as [`CommitError::Stale`].
pub async fn commit_intent(pool: &PgPool, intent: &Intent) -> Result<(), CommitError> {
    if intent.is_noop() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for mutation in &intent.mutations {
        apply(&mut tx, mutation).await?;
    }
    tx.commit().await?;
    tracing::debug!(mutations = intent.mutations.len(), "intent committed");
    Ok(())
}

async fn apply(conn: &mut PgConnection, mutation: &Mutation) -> Result<(), CommitError> {
    match mutation {
        Mutation::SetPlayerHouse { player, house } => {
            let done = sqlx::query("UPDATE players SET house = $2 WHERE id = $1 AND house IS NULL")
                .bind(player.as_str())
                .bind(house.as_str())
                .execute(&mut *conn)
                .await?;
            touched(done, || format!("{player} already joined a house"))
        }
        Mutation::SpendTroops { player, troops } => {
            let done = sqlx::query(
                "UPDATE players SET troops = troops - $2 WHERE id = $1 AND troops >= $2",
            )
            .bind(player.as_str())
            .bind(to_db(*troops))
            .execute(&mut *conn)
            .await?;
            touched(done, || format!("{player} no longer has {troops} troops"))
        }
        Mutation::AdjustPlayer {
            player,
            troops,
            money,
        } => {
            let done = sqlx::query(
                "UPDATE players SET troops = GREATEST(troops + $2, 0), \
                 money = GREATEST(money + $3, 0) WHERE id = $1",
            )
            .bind(player.as_str())
            .bind(*troops)
            .bind(*money)
            .execute(&mut *conn)
            .await?;
            touched(done, || format!("player {player} does not exist"))
        }
        Mutation::SetTileOwner { tile, owner } => {
            let done = sqlx::query("UPDATE tiles SET owner = $2 WHERE id = $1")
                .bind(tile.as_str())
                .bind(owner.as_ref().map(|h| h.as_str()))
                .execute(&mut *conn)
                .await?;
            touched(done, || format!("tile {tile} does not exist"))
        }
        Mutation::InsertSiege {
            tile,
            attacker,
            created_at,
            expires_at,
        } => {
            let result = sqlx::query(
                "INSERT INTO sieges (tile, attacker, created_at, expires_at, state) \
                 SELECT $1, $2, $3, $4, 'active' \
                 WHERE EXISTS (SELECT 1 FROM tiles WHERE id = $1) \
                 AND NOT EXISTS (SELECT 1 FROM sieges WHERE tile = $1 AND state = 'active')",
            )
            .bind(tile.as_str())
            .bind(attacker.as_str())
            .bind(to_db(created_at.as_millis()))
            .bind(to_db(expires_at.as_millis()))
            .execute(&mut *conn)
            .await;
            match result {
                Ok(done) => touched(done, || format!("a siege is already active on {tile}")),
                Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(
                    CommitError::Stale(format!("a siege is already active on {tile}")),
                ),
                Err(err) => Err(err.into()),
            }
        }
        Mutation::RemovePledges { siege, tile } => {
            lock_active_siege(conn, *siege, tile).await?;
            sqlx::query("DELETE FROM pledges WHERE siege = $1")
                .bind(to_db(siege.0))
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
        Mutation::RemoveSiege { siege, tile } => {
            let done =
                sqlx::query("DELETE FROM sieges WHERE id = $1 AND tile = $2 AND state = 'active'")
                    .bind(to_db(siege.0))
                    .bind(tile.as_str())
                    .execute(&mut *conn)
                    .await?;
            touched(done, || format!("siege {siege} on {tile} is no longer active"))
        }
        Mutation::InsertPledge {
            siege,
            tile,
            player,
            troops,
            side,
            pledged_at,
        } => {
            let done = sqlx::query(
                "INSERT INTO pledges (siege, player, troops, side, pledged_at) \
                 SELECT $1, $3, $4, $5, $6 \
                 WHERE EXISTS (SELECT 1 FROM sieges WHERE id = $1 AND tile = $2 AND state = 'active')",
            )
            .bind(to_db(siege.0))
            .bind(tile.as_str())
            .bind(player.as_str())
            .bind(to_db(*troops))
            .bind(side.as_str())
            .bind(to_db(pledged_at.as_millis()))
            .execute(&mut *conn)
            .await?;
            touched(done, || format!("the siege on {tile} has ended"))
        }
        Mutation::InsertWar { pair } => {
            let done = sqlx::query(
                "INSERT INTO wars (house_a, house_b) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(pair.first().as_str())
            .bind(pair.second().as_str())
            .execute(&mut *conn)
            .await?;
            touched(done, || format!("{pair} are already at war"))
        }
        Mutation::RemoveWar { pair } => {
            let done = sqlx::query("DELETE FROM wars WHERE house_a = $1 AND house_b = $2")
                .bind(pair.first().as_str())
                .bind(pair.second().as_str())
                .execute(&mut *conn)
                .await?;
            touched(done, || format!("{pair} are not at war"))
        }
        Mutation::InsertWarVote { vote } => {
            let done = sqlx::query(
                "INSERT INTO war_votes (voter, house, choice, cast_at) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(vote.voter.as_str())
            .bind(vote.house.as_str())
            .bind(vote.choice.key())
            .bind(to_db(vote.cast_at.as_millis()))
            .execute(&mut *conn)
            .await?;
            touched(done, || format!("{} already voted", vote.voter))
        }
        Mutation::RemoveWarVotes { voters, .. } => {
            let voters: Vec<String> = voters.iter().map(|v| v.as_str().to_string()).collect();
            sqlx::query("DELETE FROM war_votes WHERE voter = ANY($1)")
                .bind(voters)
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
        Mutation::InsertTruceVote { vote } => {
            let pair = vote.pair();
            let done = sqlx::query(
                "INSERT INTO truce_votes (voter, house, target, choice, cast_at, pair_a, pair_b) \
                 SELECT $1, $2, $3, $4, $5, $6, $7 \
                 WHERE EXISTS (SELECT 1 FROM wars WHERE house_a = $6 AND house_b = $7) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(vote.voter.as_str())
            .bind(vote.house.as_str())
            .bind(vote.target.as_str())
            .bind(vote.choice.as_str())
            .bind(to_db(vote.cast_at.as_millis()))
            .bind(pair.first().as_str())
            .bind(pair.second().as_str())
            .execute(&mut *conn)
            .await?;
            touched(done, || {
                format!("{} cannot vote on a truce between {pair}", vote.voter)
            })
        }
        Mutation::RemoveTruceVotes { pair } => {
            sqlx::query("DELETE FROM truce_votes WHERE pair_a = $1 AND pair_b = $2")
                .bind(pair.first().as_str())
                .bind(pair.second().as_str())
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
    }
}

async fn lock_active_siege(
    conn: &mut PgConnection,
    siege: SiegeId,
    tile: &TileId,
) -> Result<(), CommitError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM sieges WHERE id = $1 AND tile = $2 AND state = 'active' FOR UPDATE",
    )
    .bind(to_db(siege.0))
    .bind(tile.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(_) => Ok(()),
        None => Err(CommitError::Stale(format!(
            "siege {siege} on {tile} is no longer active"
        ))),
    }
}

fn touched(done: PgQueryResult, stale: impl FnOnce() -> String) -> Result<(), CommitError> {
    if done.rows_affected() == 0 {
        Err(CommitError::Stale(stale()))
    } else {
        Ok(())
    }
}
