//! Fieldjudge Runner: officiating sessions around the core engine.
//!
//! This crate builds on `fieldjudge-core` to provide:
//! - TOML session configuration with path resolution
//! - An append-only JSONL attempt store with replay and compaction
//! - Vertical and horizontal sessions that apply commands, queue writes, and
//!   retry saves without ever rolling state back

pub mod config;
pub mod session;
pub mod store;

pub use config::{ConfigError, Discipline, SessionConfig};
pub use session::{
    open_horizontal, open_vertical, Applied, HorizontalSession, OfficiatingSession,
    PendingWrite, RosterFile, SessionError,
};
pub use store::{JsonlAttemptStore, StoreError, StoreLine};
