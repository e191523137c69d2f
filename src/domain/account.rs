use serde::{Deserialize, Serialize};

/// The read-side view of an account, as returned to callers of the query
/// entry point. `amount` is the raw world-state value, untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Amount")]
    pub amount: String,
}

impl AccountView {
    pub fn new(name: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
        }
    }

    /// Build a view from the bytes held in world state.
    /// Invalid UTF-8 is replaced rather than rejected; the service validates
    /// balances on the write path, not on reads.
    pub fn from_state(name: &str, value: &[u8]) -> Self {
        Self::new(name, String::from_utf8_lossy(value))
    }
}
