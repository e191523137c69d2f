use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Balance, InvocationError};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{message}")]
    NotFound { key: String, message: String },

    #[error("{message}")]
    StorageFailure {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Corrupt state for {key}: stored value {value:?} is not a balance")]
    CorruptState { key: String, value: String },

    #[error("Balance overflow for {key}: {balance} + {delta} exceeds the supported range")]
    Overflow {
        key: String,
        balance: Balance,
        delta: Balance,
    },
}

impl LedgerError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(message.into())
    }

    pub fn not_found(key: &str, message: impl Into<String>) -> Self {
        LedgerError::NotFound {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>, source: anyhow::Error) -> Self {
        LedgerError::StorageFailure {
            message: message.into(),
            source,
        }
    }

    /// The structured record handed back to callers of the query path.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.to_string())
    }
}

impl From<InvocationError> for LedgerError {
    fn from(err: InvocationError) -> Self {
        LedgerError::InvalidArgument(err.to_string())
    }
}

/// Minimal error record: `{"Error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "Error")]
    pub error: String,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "Error": self.error }).to_string()
    }
}
