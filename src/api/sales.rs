use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::{
        AppState, warnings,
        extract::{CurrentUser, parse_body, required},
    },
    collaborators::{NotificationEvent, dispatch},
    core::sale::{self, SaleReceipt, SaleRequest},
    entities::sale as sale_entity,
    errors::Result,
};

#[derive(Debug, Deserialize)]
pub struct SaleQuery {
    user_id: Option<String>,
    product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    success: bool,
    #[serde(flatten)]
    receipt: SaleReceipt,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SaleQuery>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SaleResponse>)> {
    let user_id = required(query.user_id, "user_id")?;
    let product_id = required(query.product_id, "product_id")?;
    user.require_owner(&user_id)?;
    let request: SaleRequest = parse_body(body)?;

    let recorded =
        sale::record_sale_within(&state.db, &user_id, product_id, request, state.deadline())
            .await?;
    let warnings = warnings(&recorded);
    let receipt = recorded.primary;

    dispatch(
        state.notifier.as_ref(),
        &user_id,
        &NotificationEvent::SaleRecorded {
            sale_id: receipt.sale.id,
            product_id,
            quantity: receipt.sold_quantity,
            total_amount: receipt.sale.total_amount,
        },
    );
    if receipt.available_after == 0 {
        dispatch(
            state.notifier.as_ref(),
            &user_id,
            &NotificationEvent::ProductSoldOut { product_id },
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            success: true,
            receipt,
            warnings,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SalesResponse {
    sales: Vec<sale_entity::Model>,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<SalesResponse>> {
    let user_id = required(query.user_id, "user_id")?;
    user.require_owner(&user_id)?;
    let sales = state.bounded(sale::list_sales(&state.db, &user_id)).await?;
    Ok(Json(SalesResponse { sales }))
}
