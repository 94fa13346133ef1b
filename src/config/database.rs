//! Database configuration module for the ledger store.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs, including the unique mirror links
//! declared on the revenue and expense entities. The one composite key the entities cannot
//! express, one budget per `(user_id, month, year)`, is added as a separate unique index.

use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::entities::{Budget, BudgetColumn, Expense, Product, Revenue, Sale, Transaction};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
    sea_query::Index,
};
use tracing::{debug, info};

/// Name of the unique index backing budget upserts
pub const BUDGET_PERIOD_INDEX: &str = "idx_budgets_user_period";

/// Establishes a pooled connection using the given settings.
///
/// Connect and acquire timeouts are both bounded by `connect_timeout_secs`, so a
/// request can never wait on the pool indefinitely.
pub async fn create_connection(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);

    debug!(url = %config.url, "Connecting to database");
    Database::connect(options).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary tables and indexes if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, Product).await?;
    create_table(db, Sale).await?;
    create_table(db, Transaction).await?;
    create_table(db, Revenue).await?;
    create_table(db, Expense).await?;
    create_table(db, Budget).await?;

    let builder = db.get_database_backend();
    let budget_period = Index::create()
        .name(BUDGET_PERIOD_INDEX)
        .table(Budget)
        .col(BudgetColumn::UserId)
        .col(BudgetColumn::Month)
        .col(BudgetColumn::Year)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&budget_period)).await?;

    info!("Database tables ensured");
    Ok(())
}
