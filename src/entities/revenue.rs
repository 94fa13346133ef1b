//! Revenue entity - Derived income row for category and period reports.
//!
//! A revenue mirrors either a `revenue` transaction (`transaction_id`) or a sale
//! (`sale_id`, with `product_id` for reporting). Both links are unique so a source
//! can never be mirrored twice.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Revenue database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "revenues")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    /// Originating transaction, if mirrored from the ledger
    #[sea_orm(unique)]
    pub transaction_id: Option<i64>,
    /// Originating sale, if mirrored from the sale recorder
    #[sea_orm(unique)]
    pub sale_id: Option<i64>,
    /// Product sold, for sale mirrors
    pub product_id: Option<i64>,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id",
        on_delete = "Cascade"
    )]
    Transaction,
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
