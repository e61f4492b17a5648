//! Fatal input errors raised while normalizing a raw grid.

use thiserror::Error;

/// Input problems that abort a load. No partial table is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalInputError {
    /// No row carries the caller's required header marker.
    #[error("required column '{marker}' not found in any row")]
    MarkerNotFound { marker: String },

    /// A two-row header was requested but the located header is the last row.
    #[error("header row {row} has no sub-header row below it")]
    MissingSubHeader { row: usize },
}
