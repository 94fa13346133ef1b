//! Unified error types for the ledger core and its HTTP surface.
//!
//! Every fallible operation in the crate returns [`Result`]. Side-effect failures that must not
//! fail a request (stock status refresh, revenue/expense mirrors) are reported separately as
//! [`crate::core::outcome::MirrorFailure`] and never become an [`Error`].

use std::time::Duration;

use thiserror::Error;

/// All errors surfaced by the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong while loading configuration
        message: String,
    },

    /// A required field is missing or malformed
    #[error("Validation error: {message}")]
    Validation {
        /// Which precondition failed
        message: String,
    },

    /// Entity absent, or not owned by the caller
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind (e.g. `"product"`)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Caller is unauthenticated or acts on another user's data
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Why the request was rejected
        message: String,
    },

    /// No stock left to sell
    #[error("Product {product_id} is out of stock (requested {requested}, available {available})")]
    OutOfStock {
        /// Product the sale was attempted on
        product_id: i64,
        /// Quantity the caller asked for
        requested: i32,
        /// Stock available when the sale was attempted
        available: i32,
    },

    /// Computed sale amount is non-finite or beyond the storage ceiling
    #[error("Invalid amount {amount} ({quantity} x {unit_price})")]
    InvalidAmount {
        /// Computed total
        amount: f64,
        /// Unit price used for the computation
        unit_price: f64,
        /// Quantity used for the computation
        quantity: i32,
    },

    /// Operation conflicts with existing state
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflicting state
        message: String,
    },

    /// A store round-trip exceeded its request-scoped deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Store failure reported by `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or socket failure (config file, listener)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] on `entity` with the given id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
