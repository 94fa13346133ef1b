//! Entity module - Contains all SeaORM entity definitions for the ledger database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod budget;
pub mod expense;
pub mod product;
pub mod revenue;
pub mod sale;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use budget::{
    BudgetStatus, CategoryMap, Column as BudgetColumn, Entity as Budget, Model as BudgetModel,
};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use product::{
    Column as ProductColumn, Entity as Product, Model as ProductModel, ProductStatus,
};
pub use revenue::{Column as RevenueColumn, Entity as Revenue, Model as RevenueModel};
pub use sale::{Column as SaleColumn, Entity as Sale, Model as SaleModel};
pub use transaction::{
    Column as TransactionColumn, EntryKind, Entity as Transaction, Model as TransactionModel,
};
