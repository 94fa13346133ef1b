//! Budget aggregation - one budget per user and calendar month.
//!
//! A budget is either a flat total or a map of category amounts; its effective total is
//! always `total_budget` when present and the sum of the categories otherwise. Writes are
//! single-statement upserts against the `(user_id, month, year)` unique index, so
//! concurrent writers can never create two rows for one period. Summaries read the
//! revenue and expense mirrors for the period, never `transactions` directly.

use std::collections::BTreeMap;

use crate::{
    core::round2,
    entities::{Budget, BudgetStatus, CategoryMap, Expense, Revenue, budget, expense, revenue},
    errors::{Error, Result},
};
use chrono::{Months, NaiveDate, Utc};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Caller input for a budget write.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    /// Flat total for the month
    #[serde(default, alias = "total_budget")]
    pub total_budget: Option<f64>,
    /// Per-category amounts
    #[serde(default)]
    pub categories: Option<BTreeMap<String, f64>>,
}

/// Period figures for a budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub month: i32,
    pub year: i32,
    /// `total_budget`, or the sum of the categories when absent
    pub total_budget: f64,
    /// Σ revenues dated in the period
    pub income: f64,
    /// Σ expenses dated in the period
    pub spent: f64,
    /// `total_budget - spent`
    pub remaining: f64,
    /// Expenses in the period grouped by category
    pub spent_by_category: BTreeMap<String, f64>,
}

/// Resolves the effective total of a budget.
#[must_use]
pub fn effective_total(total_budget: Option<f64>, categories: Option<&CategoryMap>) -> f64 {
    total_budget.unwrap_or_else(|| categories.map_or(0.0, CategoryMap::total))
}

/// Checks `month` is a calendar month and returns the first day of the period.
///
/// # Errors
/// Returns [`Error::Validation`] for a month outside `1..=12` or an unrepresentable year.
pub fn period_start(month: i32, year: i32) -> Result<NaiveDate> {
    let month = u32::try_from(month)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| Error::validation(format!("month must be between 1 and 12, got {month}")))?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::validation(format!("year {year} is out of range")))
}

fn validate_input(input: &BudgetInput) -> Result<()> {
    if input.total_budget.is_none() && input.categories.is_none() {
        return Err(Error::validation("totalBudget or categories is required"));
    }
    let amounts = input
        .total_budget
        .iter()
        .map(|total| ("totalBudget", total))
        .chain(
            input
                .categories
                .iter()
                .flatten()
                .map(|(name, amount)| (name.as_str(), amount)),
        );
    for (field, amount) in amounts {
        if !amount.is_finite() || *amount < 0.0 {
            return Err(Error::validation(format!(
                "{field} must be a non-negative number, got {amount}"
            )));
        }
    }
    Ok(())
}

fn period_conflict() -> OnConflict {
    OnConflict::columns([
        budget::Column::UserId,
        budget::Column::Month,
        budget::Column::Year,
    ])
}

/// Looks up the budget of a period without creating it.
pub async fn find_budget<C>(
    db: &C,
    user_id: &str,
    month: i32,
    year: i32,
) -> Result<Option<budget::Model>>
where
    C: ConnectionTrait,
{
    period_start(month, year)?;
    Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::Month.eq(month))
        .filter(budget::Column::Year.eq(year))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn load_period(
    db: &DatabaseConnection,
    user_id: &str,
    month: i32,
    year: i32,
) -> Result<budget::Model> {
    find_budget(db, user_id, month, year)
        .await?
        .ok_or_else(|| Error::not_found("budget", format!("{user_id}/{year}-{month:02}")))
}

/// Returns the budget of a period, inserting an empty active one if none exists.
///
/// # Errors
/// Returns [`Error::Validation`] for a month outside `1..=12`.
pub async fn get_or_create_budget(
    db: &DatabaseConnection,
    user_id: &str,
    month: i32,
    year: i32,
) -> Result<budget::Model> {
    if let Some(existing) = find_budget(db, user_id, month, year).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let empty = budget::ActiveModel {
        user_id: Set(user_id.to_string()),
        month: Set(month),
        year: Set(year),
        total_budget: Set(None),
        categories: Set(None),
        status: Set(BudgetStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let result = Budget::insert(empty)
        .on_conflict(period_conflict().do_nothing().to_owned())
        .exec_without_returning(db)
        .await;
    match result {
        // A concurrent writer created the row first
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }
    debug!(user_id, month, year, "Ensured budget row");
    load_period(db, user_id, month, year).await
}

/// Writes the budget of a period, replacing its total and categories.
///
/// # Errors
/// Returns [`Error::Validation`] for a month outside `1..=12`, an input with neither a
/// total nor categories, or negative/non-finite amounts.
pub async fn upsert_budget(
    db: &DatabaseConnection,
    user_id: &str,
    month: i32,
    year: i32,
    input: BudgetInput,
) -> Result<budget::Model> {
    period_start(month, year)?;
    validate_input(&input)?;

    let now = Utc::now();
    let row = budget::ActiveModel {
        user_id: Set(user_id.to_string()),
        month: Set(month),
        year: Set(year),
        total_budget: Set(input.total_budget),
        categories: Set(input.categories.map(CategoryMap)),
        status: Set(BudgetStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Budget::insert(row)
        .on_conflict(
            period_conflict()
                .update_columns([
                    budget::Column::TotalBudget,
                    budget::Column::Categories,
                    budget::Column::Status,
                    budget::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    info!(user_id, month, year, "Upserted budget");
    load_period(db, user_id, month, year).await
}

/// Computes the period figures of a budget from the revenue and expense mirrors.
pub async fn budget_summary(
    db: &DatabaseConnection,
    budget: &budget::Model,
) -> Result<BudgetSummary> {
    let start = period_start(budget.month, budget.year)?;
    let end = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| Error::validation(format!("year {} is out of range", budget.year)))?;

    let revenues = Revenue::find()
        .filter(revenue::Column::UserId.eq(budget.user_id.as_str()))
        .filter(revenue::Column::Date.gte(start))
        .filter(revenue::Column::Date.lt(end))
        .all(db)
        .await?;
    let expenses = Expense::find()
        .filter(expense::Column::UserId.eq(budget.user_id.as_str()))
        .filter(expense::Column::Date.gte(start))
        .filter(expense::Column::Date.lt(end))
        .all(db)
        .await?;

    let income = round2(revenues.iter().map(|r| r.amount).sum());
    let mut spent = 0.0;
    let mut spent_by_category = BTreeMap::new();
    for expense in &expenses {
        spent += expense.amount;
        *spent_by_category
            .entry(expense.category.clone())
            .or_insert(0.0) += expense.amount;
    }
    for amount in spent_by_category.values_mut() {
        *amount = round2(*amount);
    }
    let spent = round2(spent);
    let total_budget = round2(effective_total(budget.total_budget, budget.categories.as_ref()));

    Ok(BudgetSummary {
        month: budget.month,
        year: budget.year,
        total_budget,
        income,
        spent,
        remaining: round2(total_budget - spent),
        spent_by_category,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::ledger::create_transaction;
    use crate::entities::EntryKind;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    fn categories(pairs: &[(&str, f64)]) -> CategoryMap {
        CategoryMap(pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect())
    }

    #[test]
    fn test_effective_total() {
        let map = categories(&[("food", 500.0), ("rent", 1300.0)]);
        assert_eq!(effective_total(Some(1000.0), Some(&map)), 1000.0);
        assert_eq!(effective_total(None, Some(&map)), 1800.0);
        assert_eq!(effective_total(None, Some(&CategoryMap::default())), 0.0);
        assert_eq!(effective_total(None, None), 0.0);
    }

    #[test]
    fn test_period_start_validates_month() {
        assert_eq!(
            period_start(1, 2025).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert!(period_start(12, 2025).is_ok());
        for month in [0, 13, -1] {
            assert!(matches!(period_start(month, 2025), Err(Error::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_input_without_writing() -> Result<()> {
        let db = setup_test_db().await?;

        let result = upsert_budget(&db, "u1", 13, 2025, BudgetInput::default()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = upsert_budget(&db, "u1", 1, 2025, BudgetInput::default()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let input = BudgetInput {
            total_budget: Some(-1.0),
            categories: None,
        };
        let result = upsert_budget(&db, "u1", 1, 2025, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        assert_eq!(Budget::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_then_get_same_period() -> Result<()> {
        let db = setup_test_db().await?;
        let input = BudgetInput {
            total_budget: Some(1800.0),
            categories: None,
        };
        upsert_budget(&db, "u1", 1, 2025, input).await?;

        let budget = get_or_create_budget(&db, "u1", 1, 2025).await?;
        assert_eq!(budget.total_budget, Some(1800.0));
        assert_eq!(budget.status, BudgetStatus::Active);

        let summary = budget_summary(&db, &budget).await?;
        assert_eq!(summary.total_budget, 1800.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_period() -> Result<()> {
        let db = setup_test_db().await?;
        let first = upsert_budget(
            &db,
            "u1",
            3,
            2025,
            BudgetInput {
                total_budget: Some(1000.0),
                categories: None,
            },
        )
        .await?;
        let second = upsert_budget(
            &db,
            "u1",
            3,
            2025,
            BudgetInput {
                total_budget: None,
                categories: Some(categories(&[("food", 400.0), ("fun", 150.0)]).0),
            },
        )
        .await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.total_budget, None);
        assert_eq!(
            effective_total(second.total_budget, second.categories.as_ref()),
            550.0
        );
        assert_eq!(Budget::find().count(&db).await?, 1);

        // Other periods and users get their own rows
        get_or_create_budget(&db, "u1", 4, 2025).await?;
        get_or_create_budget(&db, "u2", 3, 2025).await?;
        assert_eq!(Budget::find().count(&db).await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let first = get_or_create_budget(&db, "u1", 6, 2025).await?;
        let second = get_or_create_budget(&db, "u1", 6, 2025).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(first.total_budget, None);

        let summary = budget_summary(&db, &first).await?;
        assert_eq!(summary.total_budget, 0.0);
        assert_eq!(summary.remaining, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_reads_period_mirrors() -> Result<()> {
        let db = setup_test_db().await?;
        let budget = upsert_budget(
            &db,
            "u1",
            1,
            2025,
            BudgetInput {
                total_budget: None,
                categories: Some(categories(&[("food", 500.0), ("rent", 1300.0)]).0),
            },
        )
        .await?;

        for (kind, amount, category, day) in [
            (EntryKind::Expense, 120.0, "food", (2025, 1, 5)),
            (EntryKind::Expense, 30.5, "food", (2025, 1, 31)),
            (EntryKind::Expense, 1300.0, "rent", (2025, 1, 1)),
            (EntryKind::Revenue, 4000.0, "salary", (2025, 1, 10)),
            // Outside the period
            (EntryKind::Expense, 99.0, "food", (2025, 2, 1)),
        ] {
            let mut new = sample_new_transaction(kind, amount, category);
            new.date = NaiveDate::from_ymd_opt(day.0, day.1, day.2);
            create_transaction(&db, "u1", new).await?;
        }
        // Another user's spending
        create_transaction(&db, "u2", sample_new_transaction(EntryKind::Expense, 7.0, "food"))
            .await?;

        let summary = budget_summary(&db, &budget).await?;
        assert_eq!(summary.total_budget, 1800.0);
        assert_eq!(summary.income, 4000.0);
        assert_eq!(summary.spent, 1450.5);
        assert_eq!(summary.remaining, 349.5);
        assert_eq!(summary.spent_by_category["food"], 150.5);
        assert_eq!(summary.spent_by_category["rent"], 1300.0);
        Ok(())
    }
}
