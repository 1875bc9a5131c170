//! Component G: selective field extraction from Terraform state and
//! kubeconfig files. Neither format recurses or counts against `max_depth`.

pub mod kubeconfig;
pub mod tfstate;

use crate::{
    error::BudgetKind,
    limits::{Counters, Limits, Stats},
    sink::Emit,
};

/// Shared collaborators for one structured-extraction call: both
/// extractors emit under the same `outer_rel` virtual path and charge the
/// same per-artifact counters as the archive walker does.
pub struct ExtractCtx<'a> {
    /// The workspace-relative path of the file being extracted from; the
    /// virtual path prefix for every emission.
    pub outer_rel: &'a str,
    /// Per-artifact counters, shared with the archive walker's notion of
    /// "this top-level artifact."
    pub counters: &'a Counters,
    /// The traversal's configured limits.
    pub limits: &'a Limits,
    /// Aggregate guardrail stats.
    pub stats: &'a Stats,
    /// The sink entries are emitted to.
    pub sink: &'a dyn Emit,
}

/// Whether emitting one more structured-extraction entry would cross a
/// budget. Bytes aren't rechecked here: the whole file was already charged
/// by the bounded reader that read it, so a successful read means bytes are
/// within budget. Depth never applies to structured extraction.
fn emission_budget_tripped(counters: &Counters, limits: &Limits) -> Option<BudgetKind> {
    if let Some(max) = limits.max_entries() {
        if counters.entries() >= max {
            return Some(BudgetKind::Entries);
        }
    }
    if counters.deadline().expired() {
        return Some(BudgetKind::Time);
    }
    None
}

/// Emit the whole file as one textual entry under the outer relative path,
/// used when a format fails to parse or exceeds its size cap.
fn emit_whole_file(ctx: &ExtractCtx<'_>, blob: &[u8]) {
    ctx.sink.emit(ctx.outer_rel, blob);
    ctx.counters.record_entry();
}
