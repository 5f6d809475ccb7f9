//! Application error types for the document store.

use std::fmt;

use thiserror::Error;

/// Application-level errors for docstore.
///
/// "Not found" is deliberately absent: lookups return `Ok(None)` so callers
/// can branch on absence separately from transport failures.
#[derive(Error, Debug)]
pub enum AppError {
    // Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    // Transport errors, propagated as reported by the client
    #[error("Transport error: {0}")]
    Transport(#[from] elasticsearch::Error),

    #[error("Search engine rejected {operation} (status {status}): {reason}")]
    Rejected {
        operation: &'static str,
        status: u16,
        reason: String,
    },

    // Domain errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bulk {operation} failed for {} of {total} item(s): {}", failures.len(), FailureList(failures))]
    PartialBatch {
        operation: BatchOperation,
        total: usize,
        failures: Vec<BatchItemFailure>,
    },

    // Encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the status code when the store rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Rejected { status, .. } => Some(*status),
            AppError::Transport(err) => err.status_code().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Ids of the failed items for a partial batch failure.
    pub fn failed_ids(&self) -> Vec<&str> {
        match self {
            AppError::PartialBatch { failures, .. } => {
                failures.iter().filter_map(|f| f.id.as_deref()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Kind of bulk request that produced a [`AppError::PartialBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Insert,
    Delete,
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOperation::Insert => f.write_str("insert"),
            BatchOperation::Delete => f.write_str("delete"),
        }
    }
}

/// One failed item of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItemFailure {
    /// Position of the item in the submitted batch.
    pub position: usize,
    /// Document id, when one was submitted or assigned.
    pub id: Option<String>,
    /// Per-item status reported by the store.
    pub status: u16,
    /// Store-provided failure reason.
    pub reason: String,
}

struct FailureList<'a>(&'a [BatchItemFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match &failure.id {
                Some(id) => write!(f, "#{} ({}): {}", failure.position, id, failure.reason)?,
                None => write!(f, "#{}: {}", failure.position, failure.reason)?,
            }
        }
        Ok(())
    }
}
