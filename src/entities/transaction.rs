//! Transaction entity - A user-entered income or expense line.
//!
//! Each transaction has a `kind` (stored in the `type` column), an amount, a category and
//! optional installment metadata. The `installment_info` column is JSON; it is decoded once
//! by [`crate::core::installment::InstallmentInfo::decode`] and never re-parsed downstream.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a transaction is money in or money out
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Income, mirrored into `revenues`
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Spending, mirrored into `expenses`
    #[sea_orm(string_value = "expense")]
    Expense,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the transaction
    pub user_id: String,
    /// Date the money moved
    pub date: Date,
    /// Human-readable description of the transaction
    pub description: String,
    /// Transaction amount, always positive; direction comes from `kind`
    pub amount: f64,
    /// Revenue or expense
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Reporting category
    pub category: String,
    /// Payment method (e.g., `"credit_card"`, `"pix"`)
    pub payment_method: Option<String>,
    /// Free-form status (e.g., `"paid"`, `"pending"`)
    pub status: String,
    /// Flag set by the client when the purchase is split into installments
    pub is_installment: bool,
    /// Structured installment payload
    #[sea_orm(column_type = "Json", nullable)]
    pub installment_info: Option<Json>,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
    /// When the transaction was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A revenue transaction has at most one revenue mirror
    #[sea_orm(has_one = "super::revenue::Entity")]
    Revenue,
    /// An expense transaction has at most one expense mirror
    #[sea_orm(has_one = "super::expense::Entity")]
    Expense,
}

impl Related<super::revenue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Revenue.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
