//! Ledger business logic - transactions and their revenue/expense mirrors.
//!
//! Every transaction is mirrored into exactly one row of the table matching its kind
//! (`revenues` or `expenses`), linked by `transaction_id`, so category and period reports
//! never need to read `transactions` directly. The mirror step is an upsert keyed by
//! `transaction_id`: running it twice leaves one row, and a kind change removes the mirror
//! of the old kind before writing the new one.

use crate::{
    core::{
        Deadline,
        installment::{InstallmentInfo, installment_info},
        outcome::{Recorded, SideEffectKind},
    },
    entities::{EntryKind, Expense, Revenue, Transaction, expense, revenue, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, TryIntoModel, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const DEFAULT_STATUS: &str = "completed";

/// Caller input for a new transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// Defaults to today (UTC)
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub category: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Defaults to `"completed"`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_installment: bool,
    #[serde(default)]
    pub installment_info: Option<InstallmentInfo>,
}

/// Partial update of a transaction; absent fields are left unchanged.
///
/// Setting `isInstallment` to `false` also clears the installment payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<EntryKind>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub is_installment: Option<bool>,
    pub installment_info: Option<InstallmentInfo>,
}

/// The derived row mirroring a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "entry", rename_all = "lowercase")]
pub enum Mirror {
    /// Mirror of a revenue transaction
    Revenue(revenue::Model),
    /// Mirror of an expense transaction
    Expense(expense::Model),
}

impl Mirror {
    /// Id of the mirror row.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Revenue(r) => r.id,
            Self::Expense(e) => e.id,
        }
    }

    /// Kind of transaction this row mirrors.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Revenue(_) => EntryKind::Revenue,
            Self::Expense(_) => EntryKind::Expense,
        }
    }

    /// Mirrored amount.
    #[must_use]
    pub const fn amount(&self) -> f64 {
        match self {
            Self::Revenue(r) => r.amount,
            Self::Expense(e) => e.amount,
        }
    }

    /// Mirrored category.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Revenue(r) => &r.category,
            Self::Expense(e) => &e.category,
        }
    }
}

const fn mirror_kind(kind: EntryKind) -> SideEffectKind {
    match kind {
        EntryKind::Revenue => SideEffectKind::RevenueMirror,
        EntryKind::Expense => SideEffectKind::ExpenseMirror,
    }
}

fn validate_fields(description: &str, amount: f64, category: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::validation("description is required"));
    }
    if category.trim().is_empty() {
        return Err(Error::validation("category is required"));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::validation(format!(
            "amount must be a positive number, got {amount}"
        )));
    }
    Ok(())
}

fn encode_installment(info: Option<&InstallmentInfo>) -> Result<Option<Json>> {
    info.map(|info| {
        info.validate()?;
        info.encode()
    })
    .transpose()
}

/// Creates a transaction for `user_id` and mirrors it.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank description or category, a non-positive or
/// non-finite amount, or an inconsistent installment payload. A failed mirror does not
/// fail the call; it is reported in [`Recorded::side_effects`].
pub async fn create_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewTransaction,
) -> Result<Recorded<transaction::Model>> {
    create_transaction_within(db, user_id, new, Deadline::NONE).await
}

/// [`create_transaction`] with `deadline` applied to the insert and to the mirror separately.
#[instrument(skip(db, new, deadline), fields(kind = ?new.kind))]
pub async fn create_transaction_within(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewTransaction,
    deadline: Deadline,
) -> Result<Recorded<transaction::Model>> {
    let created = deadline.run(insert_transaction(db, user_id, new)).await?;
    let mut recorded = Recorded::new(created);
    mirror_into(db, &mut recorded, deadline).await;
    Ok(recorded)
}

async fn insert_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewTransaction,
) -> Result<transaction::Model> {
    validate_fields(&new.description, new.amount, &new.category)?;
    let installment = encode_installment(new.installment_info.as_ref())?;

    let now = Utc::now();
    let created = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        date: Set(new.date.unwrap_or_else(|| now.date_naive())),
        description: Set(new.description.trim().to_string()),
        amount: Set(new.amount),
        kind: Set(new.kind),
        category: Set(new.category.trim().to_string()),
        payment_method: Set(new.payment_method),
        status: Set(new.status.unwrap_or_else(|| DEFAULT_STATUS.to_string())),
        is_installment: Set(new.is_installment),
        installment_info: Set(installment),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(transaction_id = created.id, "Created transaction");
    Ok(created)
}

async fn mirror_into(
    db: &DatabaseConnection,
    recorded: &mut Recorded<transaction::Model>,
    deadline: Deadline,
) {
    let transaction = &recorded.primary;
    let kind = mirror_kind(transaction.kind);
    let id = transaction.id;
    let outcome = deadline
        .run(upsert_transaction_mirror(db, transaction))
        .await
        .map(|mirror| mirror.id());
    recorded.push(kind, "transaction", id, outcome);
}

/// Loads a transaction for `user_id`.
///
/// # Errors
/// Returns [`Error::NotFound`] if it does not exist and [`Error::Unauthorized`] if it
/// belongs to another user.
pub async fn get_transaction_for_user<C>(
    db: &C,
    user_id: &str,
    transaction_id: i64,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let transaction = Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("transaction", transaction_id))?;
    if transaction.user_id != user_id {
        return Err(Error::Unauthorized {
            message: format!("transaction {transaction_id} belongs to another user"),
        });
    }
    Ok(transaction)
}

/// Applies a partial update and re-mirrors the transaction.
pub async fn update_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
    patch: TransactionPatch,
) -> Result<Recorded<transaction::Model>> {
    update_transaction_within(db, user_id, transaction_id, patch, Deadline::NONE).await
}

/// [`update_transaction`] with `deadline` applied to the update and to the mirror separately.
pub async fn update_transaction_within(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
    patch: TransactionPatch,
    deadline: Deadline,
) -> Result<Recorded<transaction::Model>> {
    let updated = deadline
        .run(apply_patch(db, user_id, transaction_id, patch))
        .await?;
    let mut recorded = Recorded::new(updated);
    mirror_into(db, &mut recorded, deadline).await;
    Ok(recorded)
}

async fn apply_patch(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
    patch: TransactionPatch,
) -> Result<transaction::Model> {
    let existing = get_transaction_for_user(db, user_id, transaction_id).await?;

    let description = patch.description.unwrap_or_else(|| existing.description.clone());
    let category = patch.category.unwrap_or_else(|| existing.category.clone());
    let amount = patch.amount.unwrap_or(existing.amount);
    validate_fields(&description, amount, &category)?;

    let mut active: transaction::ActiveModel = existing.into();
    active.description = Set(description.trim().to_string());
    active.category = Set(category.trim().to_string());
    active.amount = Set(amount);
    if let Some(date) = patch.date {
        active.date = Set(date);
    }
    if let Some(kind) = patch.kind {
        active.kind = Set(kind);
    }
    if let Some(method) = patch.payment_method {
        active.payment_method = Set(Some(method));
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    match patch.is_installment {
        Some(false) => {
            active.is_installment = Set(false);
            active.installment_info = Set(None);
        }
        Some(true) => active.is_installment = Set(true),
        None => {}
    }
    if let Some(info) = patch.installment_info.as_ref() {
        active.installment_info = Set(encode_installment(Some(info))?);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!(transaction_id, "Updated transaction");
    Ok(updated)
}

/// Records one more paid installment and re-mirrors the transaction.
///
/// # Errors
/// Returns [`Error::Validation`] if the transaction is not an installment purchase or the
/// plan is already complete.
pub async fn pay_installment(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
) -> Result<Recorded<transaction::Model>> {
    pay_installment_within(db, user_id, transaction_id, Deadline::NONE).await
}

/// [`pay_installment`] with `deadline` applied to the payment and to the mirror separately.
pub async fn pay_installment_within(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
    deadline: Deadline,
) -> Result<Recorded<transaction::Model>> {
    let updated = deadline
        .run(advance_plan(db, user_id, transaction_id))
        .await?;
    let mut recorded = Recorded::new(updated);
    mirror_into(db, &mut recorded, deadline).await;
    Ok(recorded)
}

async fn advance_plan(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
) -> Result<transaction::Model> {
    let existing = get_transaction_for_user(db, user_id, transaction_id).await?;
    let info = installment_info(&existing).ok_or_else(|| {
        Error::validation(format!(
            "transaction {transaction_id} is not an installment purchase"
        ))
    })?;
    let next = info.advance()?;

    let mut active: transaction::ActiveModel = existing.into();
    active.installment_info = Set(Some(next.encode()?));
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(
        transaction_id,
        installment = next.current_installment,
        of = next.total_installments,
        "Recorded installment payment"
    );
    Ok(updated)
}

/// Hard-deletes a transaction together with every mirror linked to it.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
) -> Result<()> {
    let transaction = get_transaction_for_user(db, user_id, transaction_id).await?;

    let txn = db.begin().await?;
    Revenue::delete_many()
        .filter(revenue::Column::TransactionId.eq(transaction_id))
        .exec(&txn)
        .await?;
    Expense::delete_many()
        .filter(expense::Column::TransactionId.eq(transaction_id))
        .exec(&txn)
        .await?;
    transaction.delete(&txn).await?;

    txn.commit().await?;
    info!(transaction_id, user_id, "Deleted transaction and its mirrors");
    Ok(())
}

/// Lists every transaction of `user_id`, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds the mirror linked to a transaction, whichever table it lives in.
pub async fn find_mirror<C>(db: &C, transaction_id: i64) -> Result<Option<Mirror>>
where
    C: ConnectionTrait,
{
    if let Some(revenue) = Revenue::find()
        .filter(revenue::Column::TransactionId.eq(transaction_id))
        .one(db)
        .await?
    {
        return Ok(Some(Mirror::Revenue(revenue)));
    }
    Ok(Expense::find()
        .filter(expense::Column::TransactionId.eq(transaction_id))
        .one(db)
        .await?
        .map(Mirror::Expense))
}

/// Creates or refreshes the mirror of `transaction`.
///
/// Looks the mirror up by `transaction_id` before inserting, so repeated calls leave one
/// row. A mirror in the table of the other kind (left behind by a kind change) is deleted
/// in the same store transaction.
pub async fn upsert_transaction_mirror(
    db: &DatabaseConnection,
    transaction: &transaction::Model,
) -> Result<Mirror> {
    let txn = db.begin().await?;
    let mirror = match transaction.kind {
        EntryKind::Revenue => {
            let stale = Expense::delete_many()
                .filter(expense::Column::TransactionId.eq(transaction.id))
                .exec(&txn)
                .await?;
            if stale.rows_affected > 0 {
                info!(transaction_id = transaction.id, "Removed stale expense mirror");
            }
            Mirror::Revenue(upsert_revenue(&txn, transaction).await?)
        }
        EntryKind::Expense => {
            let stale = Revenue::delete_many()
                .filter(revenue::Column::TransactionId.eq(transaction.id))
                .exec(&txn)
                .await?;
            if stale.rows_affected > 0 {
                info!(transaction_id = transaction.id, "Removed stale revenue mirror");
            }
            Mirror::Expense(upsert_expense(&txn, transaction).await?)
        }
    };
    txn.commit().await?;
    debug!(transaction_id = transaction.id, mirror_id = mirror.id(), "Mirror in sync");
    Ok(mirror)
}

async fn upsert_revenue<C>(db: &C, transaction: &transaction::Model) -> Result<revenue::Model>
where
    C: ConnectionTrait,
{
    let existing = Revenue::find()
        .filter(revenue::Column::TransactionId.eq(transaction.id))
        .one(db)
        .await?;
    let mut active: revenue::ActiveModel = match existing {
        Some(model) => model.into(),
        None => revenue::ActiveModel {
            transaction_id: Set(Some(transaction.id)),
            sale_id: Set(None),
            product_id: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        },
    };
    active.user_id = Set(transaction.user_id.clone());
    active.description = Set(transaction.description.clone());
    active.amount = Set(transaction.amount);
    active.category = Set(transaction.category.clone());
    active.date = Set(transaction.date);
    active.save(db).await?.try_into_model().map_err(Into::into)
}

async fn upsert_expense<C>(db: &C, transaction: &transaction::Model) -> Result<expense::Model>
where
    C: ConnectionTrait,
{
    let existing = Expense::find()
        .filter(expense::Column::TransactionId.eq(transaction.id))
        .one(db)
        .await?;
    let mut active: expense::ActiveModel = match existing {
        Some(model) => model.into(),
        None => expense::ActiveModel {
            transaction_id: Set(Some(transaction.id)),
            created_at: Set(Utc::now()),
            ..Default::default()
        },
    };
    active.user_id = Set(transaction.user_id.clone());
    active.description = Set(transaction.description.clone());
    active.amount = Set(transaction.amount);
    active.category = Set(transaction.category.clone());
    active.payment_method = Set(transaction.payment_method.clone());
    active.date = Set(transaction.date);
    active.is_installment = Set(installment_info(transaction).is_some());
    active.save(db).await?.try_into_model().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::installment::is_installment;
    use crate::test_utils::*;
    use sea_orm::{ConnectionTrait, PaginatorTrait};
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_transaction_validation() -> Result<()> {
        let db = setup_test_db().await?;

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let new = sample_new_transaction(EntryKind::Expense, amount, "food");
            let result = create_transaction(&db, "u1", new).await;
            assert!(matches!(result, Err(Error::Validation { .. })));
        }

        let new = sample_new_transaction(EntryKind::Expense, 10.0, " ");
        let result = create_transaction(&db, "u1", new).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut new = sample_new_transaction(EntryKind::Expense, 50.0, "electronics");
        let mut info = sample_installment_info();
        info.current_installment = 0;
        new.is_installment = true;
        new.installment_info = Some(info);
        let result = create_transaction(&db, "u1", new).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        assert_eq!(Transaction::find().count(&db).await?, 0);
        assert_eq!(Expense::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_round_trip_through_mirror() -> Result<()> {
        let db = setup_test_db().await?;
        let recorded =
            create_transaction(&db, "u1", sample_new_transaction(EntryKind::Expense, 42.5, "food"))
                .await?;
        assert!(recorded.is_consistent());
        let transaction = recorded.primary;

        let mirror = find_mirror(&db, transaction.id).await?.unwrap();
        assert_eq!(mirror.kind(), EntryKind::Expense);
        assert_eq!(mirror.amount(), 42.5);
        assert_eq!(mirror.category(), "food");
        assert_eq!(Expense::find().count(&db).await?, 1);
        assert_eq!(Revenue::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_mirror_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let transaction = create_transaction(
            &db,
            "u1",
            sample_new_transaction(EntryKind::Revenue, 300.0, "salary"),
        )
        .await?
        .primary;

        let first = upsert_transaction_mirror(&db, &transaction).await?;
        let second = upsert_transaction_mirror(&db, &transaction).await?;
        assert_eq!(first.id(), second.id());

        let rows = Revenue::find()
            .filter(revenue::Column::TransactionId.eq(transaction.id))
            .count(&db)
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_refreshes_mirror_in_place() -> Result<()> {
        let db = setup_test_db().await?;
        let transaction = create_transaction(
            &db,
            "u1",
            sample_new_transaction(EntryKind::Expense, 20.0, "food"),
        )
        .await?
        .primary;
        let before = find_mirror(&db, transaction.id).await?.unwrap();

        let patch = TransactionPatch {
            amount: Some(35.0),
            category: Some("restaurants".to_string()),
            ..Default::default()
        };
        let updated = update_transaction(&db, "u1", transaction.id, patch).await?;
        assert_eq!(updated.primary.amount, 35.0);

        let after = find_mirror(&db, transaction.id).await?.unwrap();
        assert_eq!(after.id(), before.id());
        assert_eq!(after.amount(), 35.0);
        assert_eq!(after.category(), "restaurants");
        Ok(())
    }

    #[tokio::test]
    async fn test_kind_change_removes_stale_mirror() -> Result<()> {
        let db = setup_test_db().await?;
        let transaction = create_transaction(
            &db,
            "u1",
            sample_new_transaction(EntryKind::Expense, 80.0, "freelance"),
        )
        .await?
        .primary;

        let patch = TransactionPatch {
            kind: Some(EntryKind::Revenue),
            ..Default::default()
        };
        update_transaction(&db, "u1", transaction.id, patch).await?;

        let mirror = find_mirror(&db, transaction.id).await?.unwrap();
        assert_eq!(mirror.kind(), EntryKind::Revenue);
        assert_eq!(Expense::find().count(&db).await?, 0);
        assert_eq!(Revenue::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_other_users_transaction_is_unauthorized() -> Result<()> {
        let db = setup_test_db().await?;
        let transaction = create_transaction(
            &db,
            "u1",
            sample_new_transaction(EntryKind::Expense, 20.0, "food"),
        )
        .await?
        .primary;

        let result =
            update_transaction(&db, "u2", transaction.id, TransactionPatch::default()).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = delete_transaction(&db, "u2", transaction.id).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = delete_transaction(&db, "u1", 9_999).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_mirrors() -> Result<()> {
        let db = setup_test_db().await?;
        let transaction = create_transaction(
            &db,
            "u1",
            sample_new_transaction(EntryKind::Revenue, 120.0, "salary"),
        )
        .await?
        .primary;

        delete_transaction(&db, "u1", transaction.id).await?;
        assert!(Transaction::find_by_id(transaction.id).one(&db).await?.is_none());
        assert!(find_mirror(&db, transaction.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_installment_transaction_is_stored_structured() -> Result<()> {
        let db = setup_test_db().await?;
        let mut new = sample_new_transaction(EntryKind::Expense, 50.0, "electronics");
        new.is_installment = true;
        new.installment_info = Some(sample_installment_info());
        let transaction = create_transaction(&db, "u1", new).await?.primary;

        let stored = Transaction::find_by_id(transaction.id).one(&db).await?.unwrap();
        assert!(stored.installment_info.as_ref().unwrap().is_object());
        assert!(is_installment(&stored));

        let mirror = find_mirror(&db, transaction.id).await?.unwrap();
        assert!(matches!(&mirror, Mirror::Expense(expense) if expense.is_installment));
        Ok(())
    }

    #[tokio::test]
    async fn test_pay_installment_advances_plan() -> Result<()> {
        let db = setup_test_db().await?;
        let mut new = sample_new_transaction(EntryKind::Expense, 50.0, "electronics");
        new.is_installment = true;
        new.installment_info = Some(sample_installment_info());
        let transaction = create_transaction(&db, "u1", new).await?.primary;

        let paid = pay_installment(&db, "u1", transaction.id).await?;
        let info = installment_info(&paid.primary).unwrap();
        assert_eq!(info.current_installment, 2);
        assert_eq!(info.remaining_amount, 500.0);

        let plain = create_transaction(
            &db,
            "u1",
            sample_new_transaction(EntryKind::Expense, 10.0, "food"),
        )
        .await?
        .primary;
        let result = pay_installment(&db, "u1", plain.id).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_clearing_installment_flag_drops_payload() -> Result<()> {
        let db = setup_test_db().await?;
        let mut new = sample_new_transaction(EntryKind::Expense, 50.0, "electronics");
        new.is_installment = true;
        new.installment_info = Some(sample_installment_info());
        let transaction = create_transaction(&db, "u1", new).await?.primary;

        let patch = TransactionPatch {
            is_installment: Some(false),
            ..Default::default()
        };
        let updated = update_transaction(&db, "u1", transaction.id, patch).await?.primary;
        assert!(!updated.is_installment);
        assert!(updated.installment_info.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_mirror_failure_keeps_transaction() -> Result<()> {
        let db = setup_test_db().await?;
        db.execute_unprepared("DROP TABLE expenses").await?;

        let recorded =
            create_transaction(&db, "u1", sample_new_transaction(EntryKind::Expense, 9.0, "food"))
                .await?;
        let failures: Vec<_> = recorded.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, SideEffectKind::ExpenseMirror);
        assert!(
            Transaction::find_by_id(recorded.primary.id)
                .one(&db)
                .await?
                .is_some()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_mirror_timeout_is_reported_as_failure() -> Result<()> {
        let (db, _dir) = setup_file_db(2).await?;
        let new = sample_new_transaction(EntryKind::Expense, 9.0, "food");
        let created = insert_transaction(&db, "u1", new).await?;

        let writer = db.begin().await?;
        writer
            .execute_unprepared("UPDATE transactions SET status = status")
            .await?;

        let mut recorded = Recorded::new(created);
        let deadline = Deadline::after(Duration::from_millis(200));
        mirror_into(&db, &mut recorded, deadline).await;
        writer.rollback().await?;

        let failures: Vec<_> = recorded.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, SideEffectKind::ExpenseMirror);
        assert!(failures[0].reason.contains("timed out"));
        assert_eq!(Transaction::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_transactions_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let mut older = sample_new_transaction(EntryKind::Expense, 10.0, "food");
        older.date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let mut newer = sample_new_transaction(EntryKind::Revenue, 10.0, "salary");
        newer.date = NaiveDate::from_ymd_opt(2025, 2, 1);
        create_transaction(&db, "u1", older).await?;
        create_transaction(&db, "u1", newer).await?;
        create_transaction(&db, "u2", sample_new_transaction(EntryKind::Expense, 1.0, "x")).await?;

        let listed = list_transactions(&db, "u1").await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, EntryKind::Revenue);
        Ok(())
    }
}
