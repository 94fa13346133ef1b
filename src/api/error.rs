//! HTTP mapping of [`Error`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::errors::Error;

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::OutOfStock { .. } | Self::InvalidAmount { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let mut body = json!({ "success": false, "error": message });

        // Sale rule violations carry the computed quantities for client-side diagnosis
        match self {
            Self::OutOfStock {
                product_id,
                requested,
                available,
            } => {
                body["debug"] = json!({
                    "productId": product_id,
                    "requestedQuantity": requested,
                    "availableStock": available,
                });
            }
            Self::InvalidAmount {
                amount,
                unit_price,
                quantity,
            } => {
                body["debug"] = json!({
                    "totalAmount": amount,
                    "unitPrice": unit_price,
                    "quantity": quantity,
                });
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
