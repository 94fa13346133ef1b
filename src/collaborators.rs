//! Interfaces to the collaborators this service consumes but does not own.
//!
//! Authentication, notification delivery and catalog token issuance live elsewhere.
//! Default implementations: [`HeaderAuth`], [`LogNotifier`] and [`StaticCatalogTokens`].

use std::collections::HashMap;

use axum::http::HeaderMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CatalogConfig;
use crate::errors::Result;

/// Header the default [`AuthContext`] reads the authenticated user id from
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Stable user id, matching `user_id` columns
    pub id: String,
}

/// Resolves the caller of a request.
pub trait AuthContext: Send + Sync {
    /// Returns the authenticated user, or `None` for anonymous requests.
    fn current_user(&self, headers: &HeaderMap) -> Option<AuthUser>;
}

/// Trusts the [`USER_HEADER`] set by an authenticating gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderAuth;

impl AuthContext for HeaderAuth {
    fn current_user(&self, headers: &HeaderMap) -> Option<AuthUser> {
        headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| AuthUser { id: id.to_string() })
    }
}

/// Events pushed to a user after a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A sale was recorded
    SaleRecorded {
        /// Recorded sale
        sale_id: i64,
        /// Product sold
        product_id: i64,
        /// Units sold
        quantity: i32,
        /// Sale total
        total_amount: f64,
    },
    /// A sale took the last unit of a product
    ProductSoldOut {
        /// Depleted product
        product_id: i64,
    },
}

/// Delivers notifications. Delivery is fire-and-forget.
pub trait NotificationDispatcher: Send + Sync {
    /// Sends `event` to `user_id`.
    fn notify(&self, user_id: &str, event: &NotificationEvent) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationDispatcher for LogNotifier {
    fn notify(&self, user_id: &str, event: &NotificationEvent) -> Result<()> {
        info!(user_id, ?event, "Notification");
        Ok(())
    }
}

/// Sends a notification, swallowing delivery failures.
pub fn dispatch(notifier: &dyn NotificationDispatcher, user_id: &str, event: &NotificationEvent) {
    if let Err(e) = notifier.notify(user_id, event) {
        warn!(user_id, ?event, error = %e, "Notification delivery failed");
    }
}

/// Maps a shareable catalog token to the user whose catalog it exposes.
pub trait CatalogTokenResolver: Send + Sync {
    /// Returns the owning user id, or `None` for unknown tokens.
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Token table loaded from `[catalog] tokens` in config.toml.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogTokens {
    tokens: HashMap<String, String>,
}

impl From<&CatalogConfig> for StaticCatalogTokens {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            tokens: config.tokens.clone(),
        }
    }
}

impl CatalogTokenResolver for StaticCatalogTokens {
    fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}
