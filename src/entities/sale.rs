//! Sale entity - Append-only record of units sold from a product.
//!
//! Sales are the system of record for stock depletion; product counters and revenue
//! mirrors are derived from them on a best-effort basis.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the product that was sold
    pub user_id: String,
    /// Product the units were taken from
    pub product_id: i64,
    /// Units sold (after clamping to available stock)
    pub quantity: i32,
    /// Price per unit at the time of sale
    pub unit_price: f64,
    /// `unit_price * quantity`, rounded to cents
    pub total_amount: f64,
    /// Date of the sale
    pub date: Date,
    /// Optional buyer name
    pub buyer_name: Option<String>,
    /// When the sale was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Sale and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each sale belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
