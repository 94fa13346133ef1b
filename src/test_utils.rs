//! Shared test utilities for `stock-ledger`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use crate::{
    api::AppState,
    collaborators::{HeaderAuth, LogNotifier, StaticCatalogTokens},
    config::{AppConfig, DatabaseConfig, database},
    core::{
        installment::InstallmentInfo,
        ledger::NewTransaction,
        product::{self, NewProduct},
        sale::{self, SaleRequest},
    },
    entities::{EntryKind, Product, ProductStatus, product as product_entity, sale as sale_entity},
    errors::{Error, Result},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Routes `tracing` output through the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool holds a single connection: every connection to `sqlite::memory:` opens its
/// own empty database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connect_timeout_secs: 5,
    };
    let db = database::create_connection(&config).await?;
    database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in a fresh temporary directory.
///
/// Unlike [`setup_test_db`], the pool really holds `max_connections` connections, so
/// concurrent operations contend for the store's locks. Keep the returned directory alive
/// for as long as the connection is used.
pub async fn setup_file_db(max_connections: u32) -> Result<(DatabaseConnection, TempDir)> {
    init_test_tracing();
    let dir = TempDir::new()?;
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("ledger.sqlite").display()),
        max_connections,
        connect_timeout_secs: 5,
    };
    let db = database::create_connection(&config).await?;
    database::create_tables(&db).await?;
    Ok((db, dir))
}

/// Builds a product registration with fixed costs.
///
/// # Defaults
/// * `category`: "general"
/// * `purchase_price`: 10.0, `shipping_cost`: 2.0, `other_costs`: 0.0
/// * `status`: purchased, private
pub fn sample_new_product(name: &str, quantity: i32, selling_price: f64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: "general".to_string(),
        quantity,
        selling_price,
        purchase_price: 10.0,
        shipping_cost: 2.0,
        other_costs: 0.0,
        status: None,
        is_public: false,
    }
}

/// Creates a test product owned by `user_id` (unit cost 12.0).
pub async fn create_test_product(
    db: &DatabaseConnection,
    user_id: &str,
    quantity: i32,
    selling_price: f64,
) -> Result<product_entity::Model> {
    product::create_product(db, user_id, sample_new_product("Widget", quantity, selling_price))
        .await
}

/// Overwrites stock counters and stored status, bypassing validation.
pub async fn set_stock(
    db: &DatabaseConnection,
    product_id: i64,
    quantity: i32,
    quantity_sold: i32,
    status: ProductStatus,
) -> Result<product_entity::Model> {
    let product = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?;
    let mut active: product_entity::ActiveModel = product.into();
    active.quantity = Set(quantity);
    active.quantity_sold = Set(quantity_sold);
    active.status = Set(status);
    Ok(active.update(db).await?)
}

/// Publishes a product to the shareable catalog.
pub async fn make_public(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<product_entity::Model> {
    let product = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?;
    let mut active: product_entity::ActiveModel = product.into();
    active.is_public = Set(true);
    Ok(active.update(db).await?)
}

/// Records a sale through the normal sale path and returns the stored row.
pub async fn record_test_sale(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    quantity: i32,
) -> Result<sale_entity::Model> {
    let request = SaleRequest {
        quantity,
        date: NaiveDate::from_ymd_opt(2025, 1, 15),
        buyer_name: None,
    };
    let recorded = sale::record_sale(db, user_id, product_id, request).await?;
    Ok(recorded.primary.sale)
}

/// Builds a plain transaction dated today.
pub fn sample_new_transaction(kind: EntryKind, amount: f64, category: &str) -> NewTransaction {
    NewTransaction {
        date: None,
        description: format!("{category} entry"),
        amount,
        kind,
        category: category.to_string(),
        payment_method: None,
        status: None,
        is_installment: false,
        installment_info: None,
    }
}

/// A 12 x 50.00 plan with the first installment paid.
pub fn sample_installment_info() -> InstallmentInfo {
    InstallmentInfo {
        total_amount: 600.0,
        total_installments: 12,
        current_installment: 1,
        installment_amount: 50.0,
        remaining_amount: 550.0,
        next_due_date: NaiveDate::from_ymd_opt(2025, 2, 10),
    }
}

/// Application state over `db` with the default collaborators.
pub fn test_state(db: DatabaseConnection) -> AppState {
    test_state_with_config(db, AppConfig::default())
}

/// Application state over `db` with a custom configuration.
pub fn test_state_with_config(db: DatabaseConnection, config: AppConfig) -> AppState {
    let catalog = StaticCatalogTokens::from(&config.catalog);
    AppState {
        db,
        config: Arc::new(config),
        auth: Arc::new(HeaderAuth),
        notifier: Arc::new(LogNotifier),
        catalog: Arc::new(catalog),
    }
}

/// Sends one request through `app` and decodes the JSON response.
///
/// `user` is sent as the authenticated-user header; `body`, when present, as JSON.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header(crate::collaborators::USER_HEADER, user);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
