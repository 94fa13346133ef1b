//! HTTP surface - an `axum` router over the core operations.
//!
//! Handlers authenticate through [`AuthContext`], run their store work under the
//! deadline from `[server] request_timeout_secs` and translate
//! [`Error`](crate::errors::Error) into status codes (see `error.rs`). Writes with side
//! effects get the deadline per step, so only the primary write can time the request out.

mod budgets;
mod error;
mod extract;
mod products;
mod sales;
mod transactions;

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    collaborators::{AuthContext, CatalogTokenResolver, NotificationDispatcher},
    config::AppConfig,
    core::{Deadline, outcome::Recorded},
    errors::Result,
};

pub use extract::CurrentUser;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Store connection pool
    pub db: DatabaseConnection,
    /// Loaded settings
    pub config: Arc<AppConfig>,
    /// Resolves the caller of a request
    pub auth: Arc<dyn AuthContext>,
    /// Fire-and-forget notifications
    pub notifier: Arc<dyn NotificationDispatcher>,
    /// Maps catalog tokens to their owner
    pub catalog: Arc<dyn CatalogTokenResolver>,
}

impl AppState {
    /// The per-step deadline from `[server] request_timeout_secs`.
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.server.request_timeout())
    }

    /// Runs `operation` under the request deadline.
    ///
    /// # Errors
    /// Returns [`Error::Timeout`](crate::errors::Error::Timeout) when the deadline elapses,
    /// otherwise whatever `operation` returns.
    pub async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.deadline().run(operation).await
    }
}

/// Human-readable side-effect failures, returned alongside a successful write.
fn warnings<T>(recorded: &Recorded<T>) -> Vec<String> {
    recorded.failures().map(ToString::to_string).collect()
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sales", post(sales::create).get(sales::list))
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route(
            "/transactions/{id}",
            put(transactions::update).delete(transactions::remove),
        )
        .route("/transactions/{id}/mirror", get(transactions::mirror))
        .route(
            "/transactions/{id}/installments/pay",
            post(transactions::pay_installment),
        )
        .route("/budgets", get(budgets::get).post(budgets::upsert))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::remove),
        )
        .route("/catalog/{token}", get(products::catalog))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `[server] bind_addr` and serves until the process is stopped.
///
/// # Errors
/// Returns [`Error::Io`](crate::errors::Error::Io) if the address cannot be bound or the
/// server fails.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.server.bind_addr.clone();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
