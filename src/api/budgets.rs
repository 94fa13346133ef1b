use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::{
        AppState,
        extract::{CurrentUser, parse_body, required},
    },
    core::budget::{self, BudgetInput, BudgetSummary},
    entities::budget as budget_entity,
    errors::Result,
};

/// Period key, accepted from the query string and, for writes, from the body.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(alias = "user")]
    user_id: Option<String>,
    month: Option<i32>,
    year: Option<i32>,
}

impl PeriodQuery {
    fn or(self, fallback: Self) -> Self {
        Self {
            user_id: self.user_id.or(fallback.user_id),
            month: self.month.or(fallback.month),
            year: self.year.or(fallback.year),
        }
    }

    fn resolve(self, user: &CurrentUser) -> Result<(String, i32, i32)> {
        let user_id = required(self.user_id, "user_id")?;
        let month = required(self.month, "month")?;
        let year = required(self.year, "year")?;
        user.require_owner(&user_id)?;
        Ok((user_id, month, year))
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    budget: budget_entity::Model,
    summary: BudgetSummary,
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<BudgetResponse>> {
    let (user_id, month, year) = query.resolve(&user)?;
    state
        .bounded(async {
            let budget = budget::get_or_create_budget(&state.db, &user_id, month, year).await?;
            let summary = budget::budget_summary(&state.db, &budget).await?;
            Ok(Json(BudgetResponse { budget, summary }))
        })
        .await
}

pub async fn upsert(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PeriodQuery>,
    Json(body): Json<Value>,
) -> Result<Json<BudgetResponse>> {
    let from_body: PeriodQuery = parse_body(body.clone())?;
    let (user_id, month, year) = query.or(from_body).resolve(&user)?;
    let input: BudgetInput = parse_body(body)?;
    state
        .bounded(async {
            let budget = budget::upsert_budget(&state.db, &user_id, month, year, input).await?;
            let summary = budget::budget_summary(&state.db, &budget).await?;
            Ok(Json(BudgetResponse { budget, summary }))
        })
        .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use crate::api::router;
    use crate::errors::Result;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_then_get_budget() -> Result<()> {
        let app = router(test_state(setup_test_db().await?));

        let body = json!({"user": "u1", "month": 1, "year": 2025, "total_budget": 1800});
        let (status, _) = send(&app, "POST", "/budgets", Some("u1"), Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let uri = "/budgets?user_id=u1&month=1&year=2025";
        let (status, body) = send(&app, "GET", uri, Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["totalBudget"], 1800.0);
        assert_eq!(body["budget"]["month"], 1);

        let categories = json!({"categories": {"food": 500.0, "rent": 900.0}});
        let (status, body) = send(&app, "POST", uri, Some("u1"), Some(categories)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["totalBudget"], 1400.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_budget_creates_empty_period() -> Result<()> {
        let app = router(test_state(setup_test_db().await?));
        let uri = "/budgets?user_id=u1&month=3&year=2025";
        let (status, body) = send(&app, "GET", uri, Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["totalBudget"], 0.0);
        assert_eq!(body["budget"]["status"], "active");
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_rejects_bad_period() -> Result<()> {
        let app = router(test_state(setup_test_db().await?));

        let no_month = "/budgets?user_id=u1&year=2025";
        let (status, _) = send(&app, "GET", no_month, Some("u1"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let bad_month = "/budgets?user_id=u1&month=13&year=2025";
        let (status, _) = send(&app, "GET", bad_month, Some("u1"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let other_user = "/budgets?user_id=u1&month=1&year=2025";
        let (status, _) = send(&app, "GET", other_user, Some("u2"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
