//! Tagged results for operations that pair a required write with best-effort side effects.
//!
//! The primary entity (a sale, a transaction) is the system of record. Product status
//! refreshes and revenue/expense mirrors are conveniences: when they fail the primary
//! write still stands, and the failure is carried here (and logged) instead of failing
//! the request.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Which derived row a side effect maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffectKind {
    /// Product status refresh after a sale
    ProductStatus,
    /// Revenue row mirroring a sale or a revenue transaction
    RevenueMirror,
    /// Expense row mirroring an expense transaction
    ExpenseMirror,
    /// Removal of a mirror left behind by a type change
    StaleMirrorCleanup,
}

impl fmt::Display for SideEffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProductStatus => "product status",
            Self::RevenueMirror => "revenue mirror",
            Self::ExpenseMirror => "expense mirror",
            Self::StaleMirrorCleanup => "stale mirror cleanup",
        };
        f.write_str(name)
    }
}

/// A side effect that failed after the primary write succeeded.
#[derive(Debug, Clone, Error)]
#[error("{kind} for {source_entity} {source_id} failed: {reason}")]
pub struct MirrorFailure {
    /// What was being maintained
    pub kind: SideEffectKind,
    /// Entity whose write triggered the side effect (e.g. `"sale"`)
    pub source_entity: &'static str,
    /// Id of that entity, for manual reconciliation
    pub source_id: i64,
    /// Underlying error message
    pub reason: String,
}

/// Result of one side effect: the id of the row it touched, or why it failed.
#[derive(Debug, Clone)]
pub struct SideEffect {
    /// What was being maintained
    pub kind: SideEffectKind,
    /// Outcome
    pub outcome: Result<i64, MirrorFailure>,
}

/// A primary entity plus the outcome of every side effect attempted after it was written.
#[derive(Debug, Clone)]
pub struct Recorded<T> {
    /// The entity that was created or updated
    pub primary: T,
    /// Side effects in the order they were attempted
    pub side_effects: Vec<SideEffect>,
}

impl<T> Recorded<T> {
    /// Wraps a primary entity with no side effects yet.
    pub const fn new(primary: T) -> Self {
        Self {
            primary,
            side_effects: Vec::new(),
        }
    }

    /// Records the outcome of a side effect, logging failures with the source ids.
    pub fn push<E: fmt::Display>(
        &mut self,
        kind: SideEffectKind,
        source_entity: &'static str,
        source_id: i64,
        outcome: Result<i64, E>,
    ) {
        let outcome = outcome.map_err(|e| {
            let failure = MirrorFailure {
                kind,
                source_entity,
                source_id,
                reason: e.to_string(),
            };
            warn!(
                kind = %kind,
                source_entity,
                source_id,
                reason = %failure.reason,
                "Side effect failed; primary write kept"
            );
            failure
        });
        self.side_effects.push(SideEffect { kind, outcome });
    }

    /// Failed side effects, if any.
    pub fn failures(&self) -> impl Iterator<Item = &MirrorFailure> {
        self.side_effects.iter().filter_map(|s| s.outcome.as_ref().err())
    }

    /// Whether every side effect succeeded.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.failures().next().is_none()
    }

    /// The id written by the first successful side effect of `kind`.
    #[must_use]
    pub fn side_effect_id(&self, kind: SideEffectKind) -> Option<i64> {
        self.side_effects
            .iter()
            .filter(|s| s.kind == kind)
            .find_map(|s| s.outcome.as_ref().ok().copied())
    }
}
