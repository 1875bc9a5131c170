//! Components E and F: the archive walker and the container walker, plus
//! the shared context they thread through nested recursion.

pub mod archive;
pub mod container;

use std::fs::File;

use crate::{
    limits::{Counters, Limits, Stats},
    sink::Emit,
};

/// The byte source backing one archive walk: a file handle (top level) or a
/// fully-buffered blob (a nested archive, already decompressed in full by
/// the bounded reader that discovered it).
///
/// Zip input is always file-backed or full-blob-backed, never a pure
/// stream, because the central directory sits at the end of the archive.
pub enum ArchiveSource {
    /// A top-level artifact opened directly from the workspace.
    File(File),
    /// A nested archive's fully decompressed bytes.
    Bytes(Vec<u8>),
}

/// Context threaded through one top-level artifact's entire nested-archive
/// recursion: counters, limits, stats, and sink are shared by reference;
/// `prefix`, `sep`, and `depth` change per recursion level.
pub struct WalkCtx<'a> {
    /// The virtual path prefix accumulated so far.
    pub prefix: String,
    /// Separator used when joining a direct entry's inner name to `prefix`.
    /// `"::"` for ordinary archive walks, `"/"` for container in-layer walks.
    pub sep: &'static str,
    /// Current nested-archive recursion depth.
    pub depth: u32,
    /// Per-artifact counters, shared across the whole nesting chain.
    pub counters: &'a Counters,
    /// The traversal's configured limits.
    pub limits: &'a Limits,
    /// Aggregate guardrail stats.
    pub stats: &'a Stats,
    /// The sink entries are emitted to.
    pub sink: &'a dyn Emit,
}

impl<'a> WalkCtx<'a> {
    /// A child context for recursing into a nested archive found at
    /// `inner_name`: prefix extended by `"::"` regardless of the parent's
    /// separator, depth incremented by one, same shared counters/limits/
    /// stats/sink.
    pub fn nested(&self, inner_name: &str) -> WalkCtx<'a> {
        WalkCtx {
            prefix: crate::vpath::join(&self.prefix, inner_name),
            sep: crate::vpath::ARCHIVE_SEP,
            depth: self.depth + 1,
            counters: self.counters,
            limits: self.limits,
            stats: self.stats,
            sink: self.sink,
        }
    }
}
