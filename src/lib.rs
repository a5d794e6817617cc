pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod flush;
pub mod id;
pub mod model;
pub mod scenario;
pub mod store;

pub use config::EngineConfig;
pub use engine::{Engine, ResolutionScheduler, Response};
pub use error::{CommitError, EngineError, Rejection, StoreError};
pub use id::IdGenerator;
pub use model::{Action, Intent, Outcome, Timestamp};
pub use store::{CommitIntent, EntityStore, MemoryStore};
