use thiserror::Error;

use crate::{model::AdminLevel, resolve::MatchTier};

/// Structural failures that stop a whole run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("boundary reference contains no {level} units")]
    EmptyReference { level: AdminLevel },
    #[error("invalid correction table: {0}")]
    InvalidCorrections(String),
}

/// Per-row data-quality problems. Accumulated and reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssue {
    /// An administrative name field was empty or whitespace-only.
    MalformedInput { row: usize, level: AdminLevel },
    /// Every tier missed; the record carries no authoritative id.
    Unresolved { row: usize },
    /// A tier matched more than one distinct unit.
    Ambiguous {
        row: usize,
        tier: MatchTier,
        candidates: Vec<String>,
    },
}
