// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use crowdfund::storage::{MemoryStore, SqliteStore, StateEntry, StateStore};
use tempfile::TempDir;

/// Helper to create a SQLite-backed store in a temporary directory
pub async fn test_store() -> Result<(SqliteStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = SqliteStore::create(db_path.to_str().unwrap()).await?;
    Ok((store, temp_dir))
}

/// Helper to build an argument list for the entry points
pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Store whose reads and/or writes always fail.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_get: bool,
    pub fail_put: bool,
}

impl FailingStore {
    pub fn failing_reads(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_get: true,
            fail_put: false,
        }
    }

    pub fn failing_writes(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_get: false,
            fail_put: true,
        }
    }
}

#[async_trait]
impl StateStore for FailingStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_get {
            bail!("read of {} refused by peer", key);
        }
        self.inner.get_state(key).await
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        if self.fail_get {
            bail!("read of {} refused by peer", key);
        }
        self.inner.get_entry(key).await
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if self.fail_put {
            bail!("write of {} refused by peer", key);
        }
        self.inner.put_state(key, value).await
    }

    async fn put_if_version(&self, key: &str, value: Vec<u8>, expected_version: i64) -> Result<bool> {
        if self.fail_put {
            bail!("write of {} refused by peer", key);
        }
        self.inner.put_if_version(key, value, expected_version).await
    }
}

/// Store that counts calls, for asserting on read/write behaviour.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for CountingStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_state(key).await
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_entry(key).await
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_state(key, value).await
    }

    async fn put_if_version(&self, key: &str, value: Vec<u8>, expected_version: i64) -> Result<bool> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_if_version(key, value, expected_version).await
    }
}

/// Store that yields between the read and the caller's next step, so that
/// unserialized read-modify-write sequences would interleave.
#[derive(Default)]
pub struct SlowStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl StateStore for SlowStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.inner.get_state(key).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(value)
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        let entry = self.inner.get_entry(key).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(entry)
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.put_state(key, value).await
    }

    async fn put_if_version(&self, key: &str, value: Vec<u8>, expected_version: i64) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner.put_if_version(key, value, expected_version).await
    }
}

/// Store where another writer sneaks in a credit between the first
/// version-checked read and write, the way a second host process would.
pub struct InterleavingStore {
    pub inner: MemoryStore,
    pub foreign_credit: u64,
    interfered: AtomicUsize,
}

impl InterleavingStore {
    pub fn new(inner: MemoryStore, foreign_credit: u64) -> Self {
        Self {
            inner,
            foreign_credit,
            interfered: AtomicUsize::new(0),
        }
    }

    pub fn interference_count(&self) -> usize {
        self.interfered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for InterleavingStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get_state(key).await
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        self.inner.get_entry(key).await
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.put_state(key, value).await
    }

    async fn put_if_version(&self, key: &str, value: Vec<u8>, expected_version: i64) -> Result<bool> {
        if self.interfered.fetch_add(1, Ordering::SeqCst) == 0 {
            let current = self.inner.get_state(key).await?.unwrap_or_default();
            let balance: u64 = String::from_utf8(current)?.parse()?;
            let credited = (balance + self.foreign_credit).to_string();
            self.inner.put_state(key, credited.into_bytes()).await?;
        }
        self.inner.put_if_version(key, value, expected_version).await
    }
}
