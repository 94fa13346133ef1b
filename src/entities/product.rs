//! Product entity - Represents a unit of dropshipping inventory owned by one user.
//!
//! Products carry two stock counters (`quantity` bought, `quantity_sold`) and a stored
//! lifecycle status. The status shown to users is derived from both, see
//! [`crate::core::status::effective_status`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored lifecycle status of a product
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Ordered from the supplier
    #[sea_orm(string_value = "purchased")]
    Purchased,
    /// In transit
    #[sea_orm(string_value = "shipping")]
    Shipping,
    /// Arrived, not yet listed
    #[sea_orm(string_value = "received")]
    Received,
    /// Listed with stock available
    #[sea_orm(string_value = "selling")]
    Selling,
    /// No stock left
    #[sea_orm(string_value = "sold")]
    Sold,
}

impl ProductStatus {
    /// Pre-sale states are never overridden by stock counters.
    #[must_use]
    pub const fn is_pre_sale(self) -> bool {
        matches!(self, Self::Purchased | Self::Shipping)
    }
}

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the product
    pub user_id: String,
    /// Display name (e.g., "Wireless Earbuds")
    pub name: String,
    /// Category used for revenue mirrors and reports
    pub category: String,
    /// Units purchased
    pub quantity: i32,
    /// Units sold so far
    pub quantity_sold: i32,
    /// Price per unit charged to buyers
    pub selling_price: f64,
    /// Price per unit paid to the supplier
    pub purchase_price: f64,
    /// Shipping cost per unit
    pub shipping_cost: f64,
    /// Any other per-unit cost (fees, packaging)
    pub other_costs: f64,
    /// Stored lifecycle status
    pub status: ProductStatus,
    /// Whether the product may appear in the public catalog
    pub is_public: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product has many sales
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
