//! Installment tracking over `transactions.installment_info`.
//!
//! The payload is decoded once, here, at the store boundary. Older rows may hold the payload
//! as a JSON-encoded string instead of an object; both forms decode to [`InstallmentInfo`].
//! A payload that fails to decode downgrades its transaction to non-installment (with a
//! warning) so one corrupt row can never break a listing.

use crate::{
    core::round2,
    entities::transaction,
    errors::{Error, Result},
};
use chrono::{Months, NaiveDate};
use sea_orm::prelude::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Progress of a purchase split into installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentInfo {
    /// Full purchase price
    pub total_amount: f64,
    /// Number of installments in the plan
    pub total_installments: u32,
    /// Installments paid so far, including the current one
    pub current_installment: u32,
    /// Amount of each installment
    pub installment_amount: f64,
    /// Amount still owed
    pub remaining_amount: f64,
    /// Due date of the next installment, if any remain
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

impl InstallmentInfo {
    /// Decodes a stored payload, accepting both JSON objects and JSON-encoded strings.
    pub fn decode(value: &Json) -> std::result::Result<Self, serde_json::Error> {
        match value {
            Json::String(raw) => serde_json::from_str(raw),
            other => Self::deserialize(other),
        }
    }

    /// Encodes the payload for the JSON column.
    pub fn encode(&self) -> Result<Json> {
        serde_json::to_value(self).map_err(Into::into)
    }

    /// Checks the payload is internally consistent before it is written.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a zero-length plan, a current installment outside
    /// `1..=total_installments`, or negative/non-finite amounts.
    pub fn validate(&self) -> Result<()> {
        if self.total_installments == 0 {
            return Err(Error::validation("totalInstallments must be at least 1"));
        }
        if self.current_installment == 0 || self.current_installment > self.total_installments {
            return Err(Error::validation(format!(
                "currentInstallment must be between 1 and {}, got {}",
                self.total_installments, self.current_installment
            )));
        }
        for (field, value) in [
            ("totalAmount", self.total_amount),
            ("installmentAmount", self.installment_amount),
            ("remainingAmount", self.remaining_amount),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::validation(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Fraction of the plan paid, `current / total`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total_installments == 0 {
            return 0.0;
        }
        f64::from(self.current_installment) / f64::from(self.total_installments)
    }

    /// Whether every installment has been paid.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current_installment >= self.total_installments
    }

    /// Records one more paid installment.
    ///
    /// The remaining amount drops by one installment (never below zero) and the next due date
    /// moves one calendar month forward; it is cleared once the plan completes.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the plan is already complete.
    pub fn advance(&self) -> Result<Self> {
        if self.is_complete() {
            return Err(Error::validation(format!(
                "all {} installments are already paid",
                self.total_installments
            )));
        }
        let current_installment = self.current_installment + 1;
        let complete = current_installment >= self.total_installments;
        let remaining_amount = if complete {
            0.0
        } else {
            round2((self.remaining_amount - self.installment_amount).max(0.0))
        };
        let next_due_date = if complete {
            None
        } else {
            self.next_due_date
                .and_then(|date| date.checked_add_months(Months::new(1)))
        };
        Ok(Self {
            current_installment,
            remaining_amount,
            next_due_date,
            ..self.clone()
        })
    }
}

/// Decoded installment payload of a transaction.
///
/// Returns `None` unless the transaction is flagged as an installment *and* carries a
/// payload that decodes; a flag with a null or corrupt payload is not an installment.
#[must_use]
pub fn installment_info(transaction: &transaction::Model) -> Option<InstallmentInfo> {
    if !transaction.is_installment {
        return None;
    }
    let raw = transaction.installment_info.as_ref()?;
    if raw.is_null() {
        return None;
    }
    match InstallmentInfo::decode(raw) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(
                transaction_id = transaction.id,
                error = %e,
                "Undecodable installment_info; treating as non-installment"
            );
            None
        }
    }
}

/// Whether a transaction counts as an installment purchase.
#[must_use]
pub fn is_installment(transaction: &transaction::Model) -> bool {
    installment_info(transaction).is_some()
}

/// Per-transaction installment accessors for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentView {
    pub transaction_id: i64,
    pub description: String,
    pub current_installment: u32,
    pub total_installments: u32,
    /// `current / total`, in `0.0..=1.0`
    pub progress: f64,
    pub installment_amount: f64,
    pub remaining_amount: f64,
    pub next_due_date: Option<NaiveDate>,
}

impl InstallmentView {
    fn new(transaction: &transaction::Model, info: &InstallmentInfo) -> Self {
        Self {
            transaction_id: transaction.id,
            description: transaction.description.clone(),
            current_installment: info.current_installment,
            total_installments: info.total_installments,
            progress: info.progress(),
            installment_amount: info.installment_amount,
            remaining_amount: info.remaining_amount,
            next_due_date: info.next_due_date,
        }
    }
}

/// Totals over a user's installment purchases.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentSummary {
    /// Number of installment transactions
    pub count: usize,
    /// Σ `totalAmount`
    pub total_installment_amount: f64,
    /// Σ `remainingAmount`
    pub total_remaining: f64,
    /// `total_installment_amount - total_remaining`
    pub total_paid: f64,
    /// One entry per installment transaction
    pub installments: Vec<InstallmentView>,
}

/// Aggregates installment totals in a single pass over the same filtered set.
pub fn summarize<'a, I>(transactions: I) -> InstallmentSummary
where
    I: IntoIterator<Item = &'a transaction::Model>,
{
    let mut summary = InstallmentSummary::default();
    for transaction in transactions {
        let Some(info) = installment_info(transaction) else {
            continue;
        };
        summary.count += 1;
        summary.total_installment_amount += info.total_amount;
        summary.total_remaining += info.remaining_amount;
        summary.installments.push(InstallmentView::new(transaction, &info));
    }
    summary.total_installment_amount = round2(summary.total_installment_amount);
    summary.total_remaining = round2(summary.total_remaining);
    summary.total_paid = round2(summary.total_installment_amount - summary.total_remaining);
    summary
}
