//! Definition of the crate's error and result.

use thiserror::Error;

use crate::PartitionId;

/// The library's error enum.
///
/// Validation and coercion failures detected before dispatch are fatal: no
/// partition work is ever started for them. A failure inside a single
/// partition is recoverable at the coordinator level and surfaces as a
/// [`PartitionFailure`](crate::PartitionFailure) entry instead.
#[derive(Debug, Clone, Error)]
pub enum SortError {
    /// Invalid sort request (illegal mode/kind combination, unmapped field,
    /// malformed clause, ...).
    #[error("Invalid sort request: {0}")]
    Validation(String),
    /// A deprecated clause key was used.
    #[error("Deprecated field [{used}] used, expected [{expected}] instead")]
    DeprecatedField {
        /// The key found in the request.
        used: String,
        /// The key that replaces it.
        expected: String,
    },
    /// A value could not be coerced to the sort field's scalar type.
    ///
    /// Detected at construction time this is a validation failure; detected
    /// against a specific document at evaluation time it becomes a partition
    /// failure.
    #[error("Failed to coerce value for field [{field}]: {reason}")]
    Coercion {
        /// The sort field the coercion was attempted for.
        field: String,
        /// Why the coercion failed.
        reason: String,
    },
    /// One partition's extraction, reduction or local sort failed.
    #[error("Partition {partition} failed during sort evaluation: {reason}")]
    PartitionEvaluation {
        /// The partition that failed.
        partition: PartitionId,
        /// The cause, as reported by the partition task.
        reason: String,
    },
    /// Every dispatched partition failed; no result window can be built.
    #[error("All {0} partitions failed during sort evaluation")]
    AllPartitionsFailed(usize),
    /// System error (e.g. we failed spawning the search thread pool).
    #[error("System error: {0}")]
    SystemError(String),
}

impl SortError {
    /// Wraps an evaluation-time error into a partition-level failure.
    pub(crate) fn for_partition(self, partition: PartitionId) -> SortError {
        match self {
            already @ SortError::PartitionEvaluation { .. } => already,
            other => SortError::PartitionEvaluation {
                partition,
                reason: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for SortError {
    fn from(error: serde_json::Error) -> SortError {
        SortError::Validation(format!("failed to parse sort request: {error}"))
    }
}

impl From<rayon::ThreadPoolBuildError> for SortError {
    fn from(error: rayon::ThreadPoolBuildError) -> SortError {
        SortError::SystemError(error.to_string())
    }
}
