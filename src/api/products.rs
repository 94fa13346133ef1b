use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    api::{
        AppState,
        extract::{CurrentUser, parse_body, required},
    },
    core::product::{self, NewProduct, ProductPatch, ProductView},
    errors::{Error, Result},
};

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    products: Vec<ProductView>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    success: bool,
    product: ProductView,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ProductsResponse>> {
    let user_id = required(query.user_id, "user_id")?;
    user.require_owner(&user_id)?;
    let products = state
        .bounded(product::list_products(&state.db, &user_id))
        .await?;
    Ok(Json(ProductsResponse { products }))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let new: NewProduct = parse_body(body)?;
    let created = state
        .bounded(product::create_product(&state.db, user.id(), new))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            product: created.into(),
        }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<ProductResponse>> {
    let patch: ProductPatch = parse_body(body)?;
    let updated = state
        .bounded(product::update_product(&state.db, user.id(), id, patch))
        .await?;
    Ok(Json(ProductResponse {
        success: true,
        product: updated.into(),
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state
        .bounded(product::delete_product(&state.db, user.id(), id))
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// Public listing behind a shareable token; no authentication.
pub async fn catalog(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ProductsResponse>> {
    let owner = state
        .catalog
        .resolve(&token)
        .ok_or_else(|| Error::not_found("catalog", &token))?;
    let products = state
        .bounded(product::list_catalog(&state.db, &owner))
        .await?;
    Ok(Json(ProductsResponse { products }))
}
