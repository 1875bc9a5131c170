//! Budgets for a single traversal, and the per-artifact/aggregate counters
//! that enforce them.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use typed_builder::TypedBuilder;

use crate::error::BudgetKind;

/// Configuration bundle for one traversal.
///
/// `0` disables the corresponding bound, except `workers` (clamped to at
/// least 1) and `max_depth`: unlike the other three
/// budgets, a `max_depth` of zero is a literal "no nested recursion" cap
/// rather than "unlimited" — see DESIGN.md for why this departs from the
/// byte/entry/time knobs' "0 disables" wording.
#[derive(Copy, Clone, Debug, TypedBuilder)]
pub struct Limits {
    /// Upper bound on cumulative decompressed bytes within one top-level
    /// artifact. `0` disables.
    #[builder(default = 0)]
    max_decompressed_bytes: u64,

    /// Upper bound on emitted entries within one top-level artifact.
    /// `0` disables.
    #[builder(default = 0)]
    max_entries: u64,

    /// Upper bound on nested-archive recursion depth. `None` means
    /// unlimited; `Some(0)` means no nested archive is ever expanded.
    #[builder(default = None)]
    max_depth: Option<u32>,

    /// Upper bound on wall-clock time spent inside one top-level artifact.
    /// `Duration::ZERO` disables.
    #[builder(default = Duration::ZERO)]
    time_budget: Duration,

    /// Number of top-level artifacts processed concurrently.
    /// Clamped to at least 1.
    #[builder(default = 1)]
    workers: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Limits {
    /// Bytes charged at or above which a bounded read must stop. `None` if unbounded.
    pub fn max_decompressed_bytes(&self) -> Option<u64> {
        (self.max_decompressed_bytes > 0).then_some(self.max_decompressed_bytes)
    }

    /// Entries permitted before a guardrail trips. `None` if unbounded.
    pub fn max_entries(&self) -> Option<u64> {
        (self.max_entries > 0).then_some(self.max_entries)
    }

    /// Recursion depth permitted before a nested archive is declined. `None` if unbounded.
    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    /// Wall-clock budget for one top-level artifact. `None` if unbounded.
    pub fn time_budget(&self) -> Option<Duration> {
        (!self.time_budget.is_zero()).then_some(self.time_budget)
    }

    /// Number of worker threads, clamped to at least 1.
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }
}

/// A fixed point in time after which a per-artifact walk must stop, or the
/// absence of one.
#[derive(Copy, Clone, Debug)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// Build a deadline from a [`Limits`]' time budget, anchored at `now`.
    pub fn from_limits(limits: &Limits, now: Instant) -> Self {
        Self(limits.time_budget().map(|budget| now + budget))
    }

    /// An unbounded deadline; never trips.
    pub fn none() -> Self {
        Self(None)
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Per-artifact counters, private to one top-level artifact's processing.
///
/// Shared by reference across every level of a single top-level artifact's
/// nested-archive recursion; reset (by construction of a fresh value) at
/// each top-level artifact boundary.
#[derive(Debug)]
pub struct Counters {
    decompressed: AtomicU64,
    entries: AtomicU64,
    deadline: Deadline,
}

impl Counters {
    /// Start a fresh counter set for one top-level artifact.
    pub fn new(deadline: Deadline) -> Self {
        Self {
            decompressed: AtomicU64::new(0),
            entries: AtomicU64::new(0),
            deadline,
        }
    }

    /// Cumulative decompressed bytes charged so far.
    pub fn decompressed(&self) -> u64 {
        self.decompressed.load(Ordering::Relaxed)
    }

    /// Entries emitted so far.
    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }

    /// Charge `bytes` more decompressed bytes to the counter.
    pub fn charge_bytes(&self, bytes: u64) {
        self.decompressed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record one more emitted entry.
    pub fn record_entry(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    /// The deadline governing this artifact, if any.
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Check the current counters against `limits` and `depth`, returning
    /// the first tripped guardrail in the tie-break order byte -> entries ->
    /// depth -> time.
    pub fn check(&self, limits: &Limits, depth: u32) -> Option<BudgetKind> {
        if let Some(max) = limits.max_decompressed_bytes() {
            if self.decompressed() >= max {
                return Some(BudgetKind::Bytes);
            }
        }
        if let Some(max) = limits.max_entries() {
            if self.entries() >= max {
                return Some(BudgetKind::Entries);
            }
        }
        if let Some(max) = limits.max_depth() {
            if depth > max {
                return Some(BudgetKind::Depth);
            }
        }
        if self.deadline.expired() {
            return Some(BudgetKind::Time);
        }
        None
    }
}

/// Aggregate guardrail counters across a whole traversal.
///
/// Each reason is incremented exactly once per guardrail trip. Atomic
/// increments are used rather than a mutex, since workers only ever add to
/// these counters and never need a consistent snapshot across fields.
#[derive(Debug, Default)]
pub struct Stats {
    aborted_by_bytes: AtomicU64,
    aborted_by_entries: AtomicU64,
    aborted_by_depth: AtomicU64,
    aborted_by_time: AtomicU64,
}

impl Stats {
    /// Increment the counter matching `kind`.
    pub fn record(&self, kind: BudgetKind) {
        let counter = match kind {
            BudgetKind::Bytes => &self.aborted_by_bytes,
            BudgetKind::Entries => &self.aborted_by_entries,
            BudgetKind::Depth => &self.aborted_by_depth,
            BudgetKind::Time => &self.aborted_by_time,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Top-level artifacts aborted because `max_decompressed_bytes` was exceeded.
    pub fn aborted_by_bytes(&self) -> u64 {
        self.aborted_by_bytes.load(Ordering::Relaxed)
    }

    /// Top-level artifacts aborted because `max_entries` was exceeded.
    pub fn aborted_by_entries(&self) -> u64 {
        self.aborted_by_entries.load(Ordering::Relaxed)
    }

    /// Nested archives declined because `max_depth` was exhausted.
    pub fn aborted_by_depth(&self) -> u64 {
        self.aborted_by_depth.load(Ordering::Relaxed)
    }

    /// Top-level artifacts aborted because `time_budget` was exceeded.
    pub fn aborted_by_time(&self) -> u64 {
        self.aborted_by_time.load(Ordering::Relaxed)
    }
}
