//! Request extractors and small request helpers shared by the handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    api::AppState,
    collaborators::AuthUser,
    errors::{Error, Result},
};

/// The authenticated caller, resolved through the configured `AuthContext`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        state
            .auth
            .current_user(&parts.headers)
            .map(Self)
            .ok_or_else(|| Error::Unauthorized {
                message: "authentication required".to_string(),
            })
    }
}

impl CurrentUser {
    /// Rejects requests acting on another user's data.
    pub fn require_owner(&self, user_id: &str) -> Result<()> {
        if self.0.id != user_id {
            return Err(Error::Unauthorized {
                message: "user_id does not match the authenticated user".to_string(),
            });
        }
        Ok(())
    }

    /// Authenticated user id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// Unwraps a required query parameter.
pub fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::validation(format!("{name} is required")))
}

/// Decodes a JSON body, reporting shape errors as validation failures.
pub fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| Error::validation(format!("invalid body: {e}")))
}
