use sqlx::{PgPool, Postgres, Transaction};

use super::to_db;
use crate::error::StoreError;
use crate::store::MemoryStore;

/// Bulk-load a snapshot into empty tables with COPY FROM STDIN (text
/// format), all in one transaction.
///
/// Tables are copied parents first so foreign keys hold. The record id
/// sequence is moved past the highest loaded id afterwards.
pub async fn load_store(pool: &PgPool, store: &MemoryStore) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let mut rows = CopyRows::default();
    for tile in store.tiles() {
        rows.push(&[Some(tile.id.as_str()), tile.owner.as_ref().map(|h| h.as_str())]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_tiles.sql")).await?;

    let mut rows = CopyRows::default();
    for p in store.players() {
        rows.push(&[
            Some(p.id.as_str()),
            p.house.as_ref().map(|h| h.as_str()),
            Some(to_db(p.troops).to_string().as_str()),
            Some(to_db(p.ships).to_string().as_str()),
            Some(to_db(p.money).to_string().as_str()),
        ]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_players.sql")).await?;

    let mut rows = CopyRows::default();
    for s in store.sieges() {
        rows.push(&[
            Some(s.id.0.to_string().as_str()),
            Some(s.tile.as_str()),
            Some(s.attacker.as_str()),
            Some(to_db(s.created_at.as_millis()).to_string().as_str()),
            Some(to_db(s.expires_at.as_millis()).to_string().as_str()),
            Some(s.state.as_str()),
        ]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_sieges.sql")).await?;

    let mut rows = CopyRows::default();
    for p in store.pledges() {
        rows.push(&[
            Some(p.id.0.to_string().as_str()),
            Some(p.siege.0.to_string().as_str()),
            Some(p.player.as_str()),
            Some(to_db(p.troops).to_string().as_str()),
            Some(p.side.as_str()),
            Some(to_db(p.pledged_at.as_millis()).to_string().as_str()),
        ]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_pledges.sql")).await?;

    let mut rows = CopyRows::default();
    for pair in store.wars() {
        rows.push(&[Some(pair.first().as_str()), Some(pair.second().as_str())]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_wars.sql")).await?;

    let mut rows = CopyRows::default();
    for v in store.war_votes() {
        rows.push(&[
            Some(v.voter.as_str()),
            Some(v.house.as_str()),
            Some(v.choice.key()),
            Some(to_db(v.cast_at.as_millis()).to_string().as_str()),
        ]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_war_votes.sql")).await?;

    let mut rows = CopyRows::default();
    for v in store.truce_votes() {
        let pair = v.pair();
        rows.push(&[
            Some(v.voter.as_str()),
            Some(v.house.as_str()),
            Some(v.target.as_str()),
            Some(v.choice.as_str()),
            Some(to_db(v.cast_at.as_millis()).to_string().as_str()),
            Some(pair.first().as_str()),
            Some(pair.second().as_str()),
        ]);
    }
    rows.copy(&mut tx, include_str!("../../sql/copy_truce_votes.sql")).await?;

    sqlx::query(include_str!("../../sql/sync_record_ids.sql"))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        players = store.players().count(),
        sieges = store.sieges().count(),
        "snapshot loaded into postgres"
    );
    Ok(())
}

/// Rows of one COPY payload. `None` fields are written as NULL.
#[derive(Default)]
struct CopyRows {
    buf: String,
    count: usize,
}

impl CopyRows {
    fn push(&mut self, fields: &[Option<&str>]) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.buf.push('\t');
            }
            match field {
                Some(value) => escape_into(&mut self.buf, value),
                None => self.buf.push_str("\\N"),
            }
        }
        self.buf.push('\n');
        self.count += 1;
    }

    async fn copy(
        self,
        tx: &mut Transaction<'_, Postgres>,
        statement: &str,
    ) -> Result<(), sqlx::Error> {
        if self.count == 0 {
            return Ok(());
        }
        let mut copy = tx.copy_in_raw(statement).await?;
        copy.send(self.buf.as_bytes()).await?;
        copy.finish().await?;
        Ok(())
    }
}

/// Escape for COPY text format. Backslash goes first so later escapes are
/// not doubled.
fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_escape_and_mark_nulls() {
        let mut rows = CopyRows::default();
        rows.push(&[Some("a\tb"), None, Some("back\\slash")]);
        assert_eq!(rows.buf, "a\\tb\t\\N\tback\\\\slash\n");
        assert_eq!(rows.count, 1);
    }
}
