//! Typed failure conditions of the history subsystem.
//!
//! Public API returns anyhow::Result; callers that need to branch on the
//! condition use `err.downcast_ref::<HistoryError>()`.

use thiserror::Error;

use crate::key::{NodeId, SnapshotKey};

#[derive(Debug, Error)]
pub enum HistoryError {
    /// Host could not produce a thumbnail. The store is left unmodified.
    #[error("capture failed for {key}")]
    CaptureFailed {
        key: SnapshotKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Restore target no longer resolves in the host's original structure.
    #[error("stale reference: node '{node_id}' is not in the original structure")]
    StaleReference { node_id: NodeId },

    /// Host has no tree loaded, so there is no root to capture.
    #[error("host has no tree loaded")]
    NoTree,

    /// Malformed `history` option.
    #[error("invalid history configuration: {0}")]
    InvalidConfig(String),
}

impl HistoryError {
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, HistoryError::StaleReference { .. })
    }

    pub fn is_capture_failure(&self) -> bool {
        matches!(self, HistoryError::CaptureFailed { .. })
    }
}

/// Shortcut for `anyhow::Error -> Option<&HistoryError>`.
pub fn history_error(e: &anyhow::Error) -> Option<&HistoryError> {
    e.downcast_ref::<HistoryError>()
}
