use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::storage::{SqliteStore, VersionedState};

/// One account as it appears in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedAccount {
    pub key: String,
    pub amount: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<VersionedState> for ExportedAccount {
    fn from(state: VersionedState) -> Self {
        Self {
            key: state.key,
            amount: String::from_utf8_lossy(&state.value).into_owned(),
            version: state.version,
            updated_at: state.updated_at,
        }
    }
}

/// World-state snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldStateSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<ExportedAccount>,
}

/// Read-only dump of world state to CSV or JSON
pub struct Exporter<'a> {
    store: &'a SqliteStore,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    async fn accounts(&self) -> Result<Vec<ExportedAccount>> {
        let states = self.store.list_states().await?;
        Ok(states.into_iter().map(ExportedAccount::from).collect())
    }

    /// Export accounts to CSV format
    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["key", "amount", "version", "updated_at"])?;

        for account in &accounts {
            csv_writer.write_record([
                account.key.as_str(),
                account.amount.as_str(),
                &account.version.to_string(),
                &account.updated_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export accounts as a JSON snapshot
    pub async fn export_json<W: Write>(&self, mut writer: W) -> Result<WorldStateSnapshot> {
        let snapshot = WorldStateSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.accounts().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
