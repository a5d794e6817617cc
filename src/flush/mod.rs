//! Plain-file snapshots of the game state.

mod jsonl;

pub use jsonl::{flush_to_jsonl, read_jsonl_store};
