mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use anyhow::Result;
use async_trait::async_trait;

/// SQL migration for the world-state table
pub const MIGRATION_001_WORLD_STATE: &str = include_str!("migrations/001_world_state.sql");

/// A stored value and the number of writes its key has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    pub value: Vec<u8>,
    pub version: i64,
}

/// The key-value world state the account service reads and writes.
///
/// Reads distinguish an absent key (`Ok(None)`) from a failed read (`Err`).
/// `put_state` overwrites unconditionally and bumps the version.
/// `put_if_version` only writes when the key is still at `expected_version`
/// and reports `false` otherwise, so read-modify-write sequences from
/// different processes can detect each other.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>>;

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn put_if_version(&self, key: &str, value: Vec<u8>, expected_version: i64)
    -> Result<bool>;
}
