use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::{
        AppState, warnings,
        extract::{CurrentUser, parse_body, required},
    },
    core::{
        installment::{InstallmentSummary, summarize},
        ledger::{self, Mirror, NewTransaction, TransactionPatch},
    },
    entities::transaction,
    errors::Result,
};

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    success: bool,
    transaction: transaction::Model,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<TransactionResponse>)> {
    let new: NewTransaction = parse_body(body)?;
    let recorded =
        ledger::create_transaction_within(&state.db, user.id(), new, state.deadline()).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            success: true,
            warnings: warnings(&recorded),
            transaction: recorded.primary,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    user_id: Option<String>,
}

impl OwnerQuery {
    /// An explicit `user_id` must name the caller; omitting it means the caller.
    fn check(&self, user: &CurrentUser) -> Result<()> {
        self.user_id
            .as_deref()
            .map_or(Ok(()), |user_id| user.require_owner(user_id))
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    transactions: Vec<transaction::Model>,
    installments: InstallmentSummary,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<TransactionsResponse>> {
    let user_id = required(query.user_id, "user_id")?;
    user.require_owner(&user_id)?;
    let transactions = state
        .bounded(ledger::list_transactions(&state.db, &user_id))
        .await?;
    let installments = summarize(&transactions);
    Ok(Json(TransactionsResponse {
        transactions,
        installments,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<OwnerQuery>,
    Json(body): Json<Value>,
) -> Result<Json<TransactionResponse>> {
    query.check(&user)?;
    let patch: TransactionPatch = parse_body(body)?;
    let recorded =
        ledger::update_transaction_within(&state.db, user.id(), id, patch, state.deadline())
            .await?;
    Ok(Json(TransactionResponse {
        success: true,
        warnings: warnings(&recorded),
        transaction: recorded.primary,
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>> {
    query.check(&user)?;
    state
        .bounded(ledger::delete_transaction(&state.db, user.id(), id))
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Serialize)]
pub struct MirrorResponse {
    mirror: Option<Mirror>,
}

pub async fn mirror(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MirrorResponse>> {
    state
        .bounded(async {
            ledger::get_transaction_for_user(&state.db, user.id(), id).await?;
            let mirror = ledger::find_mirror(&state.db, id).await?;
            Ok(Json(MirrorResponse { mirror }))
        })
        .await
}

pub async fn pay_installment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<TransactionResponse>> {
    let recorded =
        ledger::pay_installment_within(&state.db, user.id(), id, state.deadline()).await?;
    Ok(Json(TransactionResponse {
        success: true,
        warnings: warnings(&recorded),
        transaction: recorded.primary,
    }))
}
