//! Postgres persistence for the game state.
//!
//! The engine runs against a [`MemoryStore`](crate::store::MemoryStore);
//! Postgres is its durable copy. [`load_store`] and [`fetch_store`] move a
//! whole snapshot in and out, and [`commit_intent`] applies each committed
//! intent in one transaction with the same staleness checks.

mod commit;
mod fetch;
mod load;

pub use commit::commit_intent;
pub use fetch::fetch_store;
pub use load::load_store;

use sqlx::PgPool;

use crate::error::StoreError;

/// Create every table, index, and the record id sequence if missing.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(include_str!("../../sql/schema.sql"))
        .execute(pool)
        .await?;
    tracing::info!("database schema is up to date");
    Ok(())
}

/// Postgres has no unsigned integers; counts are stored as BIGINT.
fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
