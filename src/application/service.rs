use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::domain::{
    AccountView, EntryPoint, Invocation, checked_credit, format_balance, parse_balance,
};
use crate::storage::StateStore;

use super::{KeyLocks, LedgerError};

/// Upper bound on read/validate/write rounds when other writers keep
/// moving the account's version underneath an increment.
const MAX_WRITE_ATTEMPTS: usize = 64;

/// Write errors carry the store's own message alongside the operation.
fn write_failure(key: &str, err: anyhow::Error) -> LedgerError {
    LedgerError::storage(format!("failed to put state for {}: {:#}", key, err), err)
}

/// Result of a successfully executed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A write was applied to world state.
    Applied,
    /// A read-only query returned an account.
    Account(AccountView),
}

/// Account transition service.
///
/// Validates requests and applies them to whatever `StateStore` the caller
/// hands in. Each operation touches exactly one key. Every attempt is at
/// most one read followed by at most one write, and that write only happens
/// once every check has passed.
#[derive(Debug, Default)]
pub struct AccountService {
    locks: KeyLocks,
}

impl AccountService {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================
    // Account operations
    // ========================

    /// Create an account, or overwrite an existing one, with `value`.
    pub async fn initialize<S>(&self, store: &S, key: &str, value: &str) -> Result<(), LedgerError>
    where
        S: StateStore + ?Sized,
    {
        let balance = parse_balance(value).map_err(|e| {
            LedgerError::invalid_argument(format!(
                "expecting integer value for account initialization, got {:?} ({})",
                value, e
            ))
        })?;

        // Also serializes against an increment that is mid-flight on the same key
        let _guard = self.locks.lock(key).await;

        store
            .put_state(key, format_balance(balance).into_bytes())
            .await
            .map_err(|e| write_failure(key, e))?;

        info!(key, balance, "account initialized");
        Ok(())
    }

    /// Credit `amount` to an existing account.
    ///
    /// The write is version-checked against the read. If another writer got
    /// in between (another process on the same store), the whole read,
    /// validate, write sequence is retried from a fresh read.
    pub async fn increment<S>(&self, store: &S, key: &str, amount: &str) -> Result<(), LedgerError>
    where
        S: StateStore + ?Sized,
    {
        // In-process callers queue here instead of spinning on conflicts
        let _guard = self.locks.lock(key).await;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let entry = store
                .get_entry(key)
                .await
                .map_err(|e| LedgerError::storage("failed to get account state", e))?
                .ok_or_else(|| {
                    LedgerError::not_found(key, format!("entity not found: {}", key))
                })?;

            let balance = std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|raw| parse_balance(raw).ok())
                .ok_or_else(|| LedgerError::CorruptState {
                    key: key.to_string(),
                    value: String::from_utf8_lossy(&entry.value).into_owned(),
                })?;

            let delta = parse_balance(amount).map_err(|e| {
                LedgerError::invalid_argument(format!(
                    "invalid transaction amount, expecting an integer value, got {:?} ({})",
                    amount, e
                ))
            })?;

            let new_balance =
                checked_credit(balance, delta).ok_or_else(|| LedgerError::Overflow {
                    key: key.to_string(),
                    balance,
                    delta,
                })?;

            let written = store
                .put_if_version(key, format_balance(new_balance).into_bytes(), entry.version)
                .await
                .map_err(|e| write_failure(key, e))?;

            if written {
                info!(key, balance, delta, new_balance, attempt, "account credited");
                return Ok(());
            }

            debug!(key, version = entry.version, attempt, "concurrent write, retrying");
            tokio::task::yield_now().await;
        }

        Err(write_failure(
            key,
            anyhow::anyhow!(
                "version conflict persisted after {} attempts",
                MAX_WRITE_ATTEMPTS
            ),
        ))
    }

    /// Read an account. Never writes.
    pub async fn query<S>(&self, store: &S, key: &str) -> Result<AccountView, LedgerError>
    where
        S: StateStore + ?Sized,
    {
        let stored = store
            .get_state(key)
            .await
            .map_err(|e| LedgerError::storage(format!("failed to get state for {}", key), e))?
            .ok_or_else(|| LedgerError::not_found(key, format!("nil amount for {}", key)))?;

        let view = AccountView::from_state(key, &stored);
        debug!(key, amount = %view.amount, "account queried");
        Ok(view)
    }

    // ========================
    // Dispatch
    // ========================

    /// Run a typed invocation inside its own transaction span.
    pub async fn execute<S>(&self, store: &S, invocation: Invocation) -> Result<Outcome, LedgerError>
    where
        S: StateStore + ?Sized,
    {
        let span = info_span!(
            "invocation",
            tx_id = %Uuid::new_v4(),
            op = invocation.operation(),
            key = invocation.key(),
            read_only = invocation.is_read_only(),
        );

        let result = async {
            match &invocation {
                Invocation::Initialize { key, value } => self
                    .initialize(store, key, value)
                    .await
                    .map(|()| Outcome::Applied),
                Invocation::Increment { key, amount } => self
                    .increment(store, key, amount)
                    .await
                    .map(|()| Outcome::Applied),
                Invocation::Query { key } => self.query(store, key).await.map(Outcome::Account),
            }
        }
        .instrument(span.clone())
        .await;

        if let Err(err) = &result {
            span.in_scope(|| warn!(error = %err, "invocation rejected"));
        }
        result
    }

    /// Parse a string-based call from the host runtime and execute it.
    pub async fn dispatch<S>(
        &self,
        store: &S,
        entry: EntryPoint,
        function: &str,
        args: &[String],
    ) -> Result<Outcome, LedgerError>
    where
        S: StateStore + ?Sized,
    {
        let invocation = Invocation::from_entry_point(entry, function, args).inspect_err(|e| {
            warn!(entry = %entry, function, error = %e, "malformed invocation");
        })?;
        self.execute(store, invocation).await
    }

    // ========================
    // Host entry points
    // ========================

    /// `init(key, value)`
    pub async fn init<S>(&self, store: &S, function: &str, args: &[String]) -> Result<(), LedgerError>
    where
        S: StateStore + ?Sized,
    {
        self.dispatch(store, EntryPoint::Init, function, args)
            .await
            .map(|_| ())
    }

    /// `invoke(key, amount)`
    pub async fn invoke<S>(&self, store: &S, function: &str, args: &[String]) -> Result<(), LedgerError>
    where
        S: StateStore + ?Sized,
    {
        self.dispatch(store, EntryPoint::Invoke, function, args)
            .await
            .map(|_| ())
    }

    /// `query("query", key)`
    pub async fn query_entry<S>(
        &self,
        store: &S,
        function: &str,
        args: &[String],
    ) -> Result<AccountView, LedgerError>
    where
        S: StateStore + ?Sized,
    {
        match self.dispatch(store, EntryPoint::Query, function, args).await? {
            Outcome::Account(view) => Ok(view),
            Outcome::Applied => Err(LedgerError::invalid_argument(
                "query entry point resolved to a ledger-changing operation",
            )),
        }
    }
}
