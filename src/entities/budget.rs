//! Budget entity - One budget row per user and calendar month.
//!
//! A budget is expressed either as a flat `total_budget` or as a map of category amounts.
//! The `(user_id, month, year)` key is enforced by a unique index created alongside the table.

use std::collections::BTreeMap;

use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Per-category budget amounts, stored as a JSON object
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CategoryMap(pub BTreeMap<String, f64>);

impl CategoryMap {
    /// Sum of all category amounts (0 for an empty map).
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

/// Lifecycle of a budget row
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// In use for its period
    #[sea_orm(string_value = "active")]
    Active,
    /// Kept for history only
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the budget
    pub user_id: String,
    /// Calendar month, 1..=12
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// Flat total; takes precedence over `categories` when present
    pub total_budget: Option<f64>,
    /// Per-category amounts
    #[sea_orm(column_type = "Json", nullable)]
    pub categories: Option<CategoryMap>,
    /// Row lifecycle
    pub status: BudgetStatus,
    /// When the budget was created
    pub created_at: DateTimeUtc,
    /// When the budget was last modified
    pub updated_at: DateTimeUtc,
}

/// `Budget` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
