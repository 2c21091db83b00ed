use thiserror::Error;

use crate::inject::BindingError;
use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid state: cannot {verb} on a {state} session")]
    InvalidState { verb: String, state: SessionState },

    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Record '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("Storage error during {verb}: {message}")]
    Storage { verb: String, message: String },

    #[error("Nested transaction: a transaction is already active on this manager")]
    NestedTransaction,

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn invalid_state(verb: &str, state: SessionState) -> Self {
        Self::InvalidState {
            verb: verb.to_string(),
            state,
        }
    }

    pub fn not_found(collection: &str, id: impl ToString) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn storage(verb: &str, message: impl ToString) -> Self {
        Self::Storage {
            verb: verb.to_string(),
            message: message.to_string(),
        }
    }

    /// Re-tag a storage error with the verb that surfaced it.
    ///
    /// Execution strategies use this to record which verb a driver failure
    /// came through. Every other variant passes through untouched.
    pub fn with_verb(self, verb: &str) -> Self {
        match self {
            Self::Storage { message, .. } => Self::Storage {
                verb: verb.to_string(),
                message,
            },
            other => other,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_verb_retags_storage() {
        let err = DbError::storage("driver", "disk full").with_verb("flush");
        match err {
            DbError::Storage { verb, message } => {
                assert_eq!(verb, "flush");
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected variant: {other}"),
        }
    }

    #[test]
    fn test_with_verb_leaves_other_variants() {
        let err = DbError::not_found("items", "42").with_verb("execute");
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
