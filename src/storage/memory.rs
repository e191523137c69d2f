use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{StateEntry, StateStore};

/// Process-local world state, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StateEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with raw values at version 1, bypassing the account service.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| {
                let entry = StateEntry {
                    value: v.into(),
                    version: 1,
                };
                (k.into(), entry)
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StateEntry>>> {
        self.entries
            .read()
            .map_err(|_| anyhow!("world state lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StateEntry>>> {
        self.entries
            .write()
            .map_err(|_| anyhow!("world state lock poisoned"))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).map(|e| e.value.clone()))
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        Ok(self.read()?.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.write()?;
        let version = entries.get(key).map_or(1, |e| e.version + 1);
        entries.insert(key.to_string(), StateEntry { value, version });
        Ok(())
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_version: i64,
    ) -> Result<bool> {
        let mut entries = self.write()?;
        match entries.get_mut(key) {
            Some(entry) if entry.version == expected_version => {
                entry.value = value;
                entry.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_state("missing").await.unwrap(), None);
        assert_eq!(store.get_entry("missing").await.unwrap(), None);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_and_bumps_version() {
        let store = MemoryStore::new();
        store.put_state("a", b"1".to_vec()).await.unwrap();
        store.put_state("a", b"2".to_vec()).await.unwrap();

        let entry = store.get_entry("a").await.unwrap().unwrap();
        assert_eq!(entry.value, b"2".to_vec());
        assert_eq!(entry.version, 2);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_if_version_rejects_stale_writes() {
        let store = MemoryStore::with_entries([("a", "10")]);

        assert!(store.put_if_version("a", b"11".to_vec(), 1).await.unwrap());
        assert!(!store.put_if_version("a", b"99".to_vec(), 1).await.unwrap());
        assert!(!store.put_if_version("b", b"1".to_vec(), 1).await.unwrap());

        let entry = store.get_entry("a").await.unwrap().unwrap();
        assert_eq!(entry.value, b"11".to_vec());
        assert_eq!(entry.version, 2);
        assert_eq!(store.get_state("b").await.unwrap(), None);
    }
}
