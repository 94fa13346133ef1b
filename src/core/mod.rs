//! Core business logic - framework-agnostic inventory, sale and ledger operations.
//!
//! Nothing in here knows about HTTP. Every function takes a SeaORM connection (or a
//! store transaction) and returns [`crate::errors::Result`].

/// Budget lookup, upsert and period summaries
pub mod budget;
/// Installment payload decoding and aggregation
pub mod installment;
/// Transaction CRUD and the revenue/expense mirror
pub mod ledger;
/// Tagged results for operations with best-effort side effects
pub mod outcome;
/// Product CRUD and derived listings
pub mod product;
/// Sale recording
pub mod sale;
/// Effective product status and stock arithmetic
pub mod status;

use std::{future::Future, time::Duration};

use crate::errors::{Error, Result};

/// Time limit applied to each store step of a request.
///
/// Writes with side effects apply it to the primary write and to every side effect
/// separately, so a slow mirror can never turn an already committed write into an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Duration>);

impl Deadline {
    /// No limit
    pub const NONE: Self = Self(None);

    /// Limits each step to `limit`.
    #[must_use]
    pub const fn after(limit: Duration) -> Self {
        Self(Some(limit))
    }

    /// Runs `step`, failing with [`Error::Timeout`] if the limit elapses first.
    pub async fn run<T, F>(self, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.0 {
            Some(limit) => tokio::time::timeout(limit, step)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => step.await,
        }
    }
}

/// Rounds a money amount to cents.
#[must_use]
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
