//! Failure taxonomy of the reconciler.
//!
//! Every variant ends the current operation only. The message shown to the
//! user is chosen at the point of failure; these carry the detail for logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Remote fetch failed and nothing was cached.
    #[error("reference rate unavailable and no cached value found")]
    RateUnavailable,

    #[error("record {record_id} unavailable: {reason}")]
    RecordUnavailable { record_id: String, reason: String },

    #[error("update of record {record_id} failed: {reason}")]
    UpdateFailed { record_id: String, reason: String },

    #[error("an update is already in progress for record {0}")]
    UpdateInProgress(String),

    #[error("unexpected error during initialization")]
    UnexpectedInit(#[source] anyhow::Error),
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
