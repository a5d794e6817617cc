use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{HousePair, Player, Pledge, Siege, Tile, TruceVote, WarVote};
use crate::store::MemoryStore;

const TILES: &str = "tiles.jsonl";
const PLAYERS: &str = "players.jsonl";
const SIEGES: &str = "sieges.jsonl";
const PLEDGES: &str = "pledges.jsonl";
const WARS: &str = "wars.jsonl";
const WAR_VOTES: &str = "war_votes.jsonl";
const TRUCE_VOTES: &str = "truce_votes.jsonl";

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Read every non-empty line of a JSONL file. A missing file reads as empty.
fn read_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Flush the game state to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes one file per
/// table: tiles, players, sieges, pledges, wars, war votes and truce votes.
pub fn flush_to_jsonl(store: &MemoryStore, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join(TILES), store.tiles())?;
    write_jsonl(&output_dir.join(PLAYERS), store.players())?;
    write_jsonl(&output_dir.join(SIEGES), store.sieges())?;
    write_jsonl(&output_dir.join(PLEDGES), store.pledges())?;
    write_jsonl(&output_dir.join(WARS), store.wars())?;
    write_jsonl(&output_dir.join(WAR_VOTES), store.war_votes())?;
    write_jsonl(&output_dir.join(TRUCE_VOTES), store.truce_votes())?;

    tracing::info!(dir = %output_dir.display(), "snapshot flushed to jsonl");
    Ok(())
}

/// Rebuild a store from files written by [`flush_to_jsonl`].
pub fn read_jsonl_store(input_dir: &Path) -> io::Result<MemoryStore> {
    let mut store = MemoryStore::new();
    for tile in read_jsonl::<Tile>(&input_dir.join(TILES))? {
        store.insert_tile(tile);
    }
    for player in read_jsonl::<Player>(&input_dir.join(PLAYERS))? {
        store.insert_player(player);
    }
    for siege in read_jsonl::<Siege>(&input_dir.join(SIEGES))? {
        store.insert_siege(siege);
    }
    for pledge in read_jsonl::<Pledge>(&input_dir.join(PLEDGES))? {
        store.insert_pledge(pledge);
    }
    for pair in read_jsonl::<HousePair>(&input_dir.join(WARS))? {
        store.insert_war(pair);
    }
    for vote in read_jsonl::<WarVote>(&input_dir.join(WAR_VOTES))? {
        store.insert_war_vote(vote);
    }
    for vote in read_jsonl::<TruceVote>(&input_dir.join(TRUCE_VOTES))? {
        store.insert_truce_vote(vote);
    }
    Ok(store)
}
