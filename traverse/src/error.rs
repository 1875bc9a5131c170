use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors surfaced from the setup phase of a traversal.
///
/// Per-artifact failures (a single malformed zip, an unreadable layer, a
/// truncated JSON file) are never escalated to this type; they are isolated
/// to the offending artifact and recorded via [`crate::Stats`] instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The workspace root does not exist or is not a directory.
    #[error("{root:?} is not a usable workspace root")]
    InvalidRoot {
        /// The root that was rejected.
        root: PathBuf,
    },

    /// Unable to walk the workspace tree.
    #[error("walk workspace")]
    Walk(#[from] walkdir::Error),

    /// Unable to load the ignore file.
    #[error("load ignore file {path:?}")]
    IgnoreFile {
        /// The ignore file that failed to load.
        path: PathBuf,
        /// The underlying error.
        #[source]
        error: ignore::Error,
    },

    /// Generic I/O failure encountered while setting up a traversal
    /// (as opposed to one isolated to a single artifact).
    #[error("io")]
    Io(#[from] io::Error),
}

/// Errors confined to a single top-level artifact or one entry within it.
///
/// Policy per entry is decided by the caller of the function that returns
/// this error: which of these abort the whole artifact versus just the
/// current entry is a per-call decision, not encoded in the type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArtifactError {
    /// A guardrail tripped. Always non-fatal: the walk of the current
    /// top-level artifact stops (or, for `Depth`, only the one recursion is
    /// declined) and the matching [`crate::Stats`] counter is incremented.
    #[error("budget exceeded: {0:?}")]
    BudgetExceeded(BudgetKind),

    /// The bytes read were not a valid instance of the expected format.
    #[error("malformed {0}")]
    Malformed(&'static str),

    /// Open/read failure on a filesystem file or archive substream.
    #[error("io")]
    Io(#[from] io::Error),
}

/// Which guardrail tripped. Mirrors [`crate::Stats`]'s four counters.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BudgetKind {
    /// `max_decompressed_bytes` exceeded.
    Bytes,
    /// `max_entries` exceeded.
    Entries,
    /// `max_depth` exceeded.
    Depth,
    /// `time_budget` exceeded.
    Time,
}
