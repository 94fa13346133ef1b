//! Sale recording - converts a sale into stock depletion plus a mirrored revenue entry.
//!
//! Only the stock reservation and the sale insert are load-bearing: they run inside one
//! store transaction that writes before it reads, and the reservation is a conditional
//! update (`quantity_sold = quantity_sold + n WHERE quantity - quantity_sold >= n`), so two
//! concurrent sales can never both take the last unit. The later one is clamped to what
//! is left, or fails with [`Error::OutOfStock`] when nothing is. The product status refresh and the
//! revenue mirror run afterwards as best-effort side effects reported through
//! [`Recorded`].

use crate::{
    core::{
        Deadline,
        outcome::{Recorded, SideEffectKind},
        product::get_product_for_user,
        round2,
        status::{available_stock, status_after_sale},
    },
    entities::{Product, Revenue, Sale, product, revenue, sale},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Highest unit price a sale may carry
pub const MAX_UNIT_PRICE: f64 = 999_999.99;

/// Storage ceiling for a sale total
pub const MAX_SALE_AMOUNT: f64 = 99_999_999.99;

/// Caller input for a sale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    /// Units requested; clamped to the available stock
    pub quantity: i32,
    /// Defaults to today (UTC)
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub buyer_name: Option<String>,
}

/// A recorded sale plus what happened to the requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: sale::Model,
    pub requested_quantity: i32,
    pub sold_quantity: i32,
    /// True when fewer units were sold than requested
    pub clamped: bool,
    /// Stock left after this sale
    pub available_after: i32,
}

/// Unit price actually charged: the selling price bounded to `0..=MAX_UNIT_PRICE`.
#[must_use]
pub fn clamp_unit_price(selling_price: f64) -> f64 {
    if selling_price.is_nan() {
        return 0.0;
    }
    selling_price.clamp(0.0, MAX_UNIT_PRICE)
}

/// Sale total rounded to cents.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] when the total is non-finite or above
/// [`MAX_SALE_AMOUNT`].
pub fn sale_total(unit_price: f64, quantity: i32) -> Result<f64> {
    let amount = round2(unit_price * f64::from(quantity));
    if !amount.is_finite() || amount > MAX_SALE_AMOUNT {
        return Err(Error::InvalidAmount {
            amount,
            unit_price,
            quantity,
        });
    }
    Ok(amount)
}

/// Touches the product row as the first write of a store transaction.
///
/// On SQLite this takes the database write lock before any stock is read, so concurrent
/// sales queue on the lock instead of failing to upgrade a read lock. On server databases
/// it locks the row. Fails with [`Error::NotFound`] if the product is absent or, when
/// `owner` is given, owned by someone else.
async fn lock_product<C>(db: &C, product_id: i64, owner: Option<&str>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut touch = Product::update_many()
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id));
    if let Some(user_id) = owner {
        touch = touch.filter(product::Column::UserId.eq(user_id));
    }
    if touch.exec(db).await?.rows_affected == 0 {
        return Err(Error::not_found("product", product_id));
    }
    Ok(())
}

/// Atomically moves `quantity_sold` forward by `quantity` if enough stock is left.
///
/// Returns `false` when another writer consumed the stock first.
async fn reserve_stock<C>(db: &C, product_id: i64, quantity: i32) -> Result<bool>
where
    C: ConnectionTrait,
{
    let remaining =
        Expr::col(product::Column::Quantity).sub(Expr::col(product::Column::QuantitySold));
    let result = Product::update_many()
        .col_expr(
            product::Column::QuantitySold,
            Expr::col(product::Column::QuantitySold).add(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(Expr::expr(remaining).gte(quantity))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Records a sale of up to `request.quantity` units of a product owned by `user_id`.
///
/// The requested quantity is silently clamped to the available stock; the receipt's
/// `clamped` flag tells the caller when that happened.
///
/// # Errors
/// - [`Error::Validation`] if `quantity < 1`
/// - [`Error::NotFound`] if the product is absent or owned by someone else
/// - [`Error::OutOfStock`] if no stock is left (including when a concurrent sale took it)
/// - [`Error::InvalidAmount`] if the total exceeds the storage ceiling
///
/// Failures of the status refresh or the revenue mirror do not fail the call; they are
/// reported in [`Recorded::side_effects`].
pub async fn record_sale(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    request: SaleRequest,
) -> Result<Recorded<SaleReceipt>> {
    record_sale_within(db, user_id, product_id, request, Deadline::NONE).await
}

/// [`record_sale`] with `deadline` applied to the sale itself and to each side effect.
///
/// A side effect that runs out of time is reported like any other side-effect failure;
/// only the sale's own store transaction can fail with [`Error::Timeout`], and then
/// nothing was written.
#[instrument(skip(db, request, deadline), fields(requested = request.quantity))]
pub async fn record_sale_within(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    request: SaleRequest,
    deadline: Deadline,
) -> Result<Recorded<SaleReceipt>> {
    if request.quantity < 1 {
        return Err(Error::validation(format!(
            "quantity must be at least 1, got {}",
            request.quantity
        )));
    }

    let (receipt, product) = deadline
        .run(commit_sale(db, user_id, product_id, request))
        .await?;
    let mut recorded = Recorded::new(receipt);

    let sale = &recorded.primary.sale;
    let sale_id = sale.id;
    let status = deadline.run(refresh_status_after_sale(db, product_id)).await;
    let mirror = deadline.run(mirror_sale_revenue(db, sale, &product)).await;
    recorded.push(SideEffectKind::ProductStatus, "sale", sale_id, status);
    recorded.push(SideEffectKind::RevenueMirror, "sale", sale_id, mirror);

    Ok(recorded)
}

/// Reserves stock and inserts the sale in one store transaction.
async fn commit_sale(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    request: SaleRequest,
) -> Result<(SaleReceipt, product::Model)> {
    let buyer_name = request
        .buyer_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());

    let txn = db.begin().await?;
    lock_product(&txn, product_id, Some(user_id)).await?;

    let mut product = get_product_for_user(&txn, user_id, product_id).await?;
    let unit_price = clamp_unit_price(product.selling_price);
    let (available, sold_quantity, total_amount) = loop {
        let available = available_stock(product.quantity, product.quantity_sold);
        if available <= 0 {
            return Err(Error::OutOfStock {
                product_id,
                requested: request.quantity,
                available,
            });
        }
        let sold_quantity = request.quantity.min(available);
        let total_amount = sale_total(unit_price, sold_quantity)?;
        if reserve_stock(&txn, product_id, sold_quantity).await? {
            break (available, sold_quantity, total_amount);
        }
        // Counters moved since the read: clamp again against the current stock
        product = get_product_for_user(&txn, user_id, product_id).await?;
    };
    debug!(available, sold_quantity, unit_price, total_amount, "Reserved stock");

    let sale = sale::ActiveModel {
        user_id: Set(user_id.to_string()),
        product_id: Set(product_id),
        quantity: Set(sold_quantity),
        unit_price: Set(unit_price),
        total_amount: Set(total_amount),
        date: Set(date),
        buyer_name: Set(buyer_name),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        sale_id = sale.id,
        product_id,
        sold_quantity,
        total_amount,
        "Recorded sale"
    );

    let receipt = SaleReceipt {
        requested_quantity: request.quantity,
        sold_quantity,
        clamped: sold_quantity < request.quantity,
        available_after: available - sold_quantity,
        sale,
    };
    Ok((receipt, product))
}

/// Re-derives the stored status from the committed counters. Returns the product id.
async fn refresh_status_after_sale(db: &DatabaseConnection, product_id: i64) -> Result<i64> {
    let txn = db.begin().await?;
    lock_product(&txn, product_id, None).await?;
    let product = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?;

    let next = status_after_sale(product.status, product.quantity, product.quantity_sold);
    if next != product.status {
        debug!(product_id, from = ?product.status, to = ?next, "Updating product status");
        let mut active: product::ActiveModel = product.into();
        active.status = Set(next);
        active.update(&txn).await?;
    }
    txn.commit().await?;
    Ok(product_id)
}

/// Creates the revenue row for a sale unless one already exists. Returns the revenue id.
async fn mirror_sale_revenue(
    db: &DatabaseConnection,
    sale: &sale::Model,
    product: &product::Model,
) -> Result<i64> {
    if let Some(existing) = Revenue::find()
        .filter(revenue::Column::SaleId.eq(sale.id))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }

    let revenue = revenue::ActiveModel {
        user_id: Set(sale.user_id.clone()),
        transaction_id: Set(None),
        sale_id: Set(Some(sale.id)),
        product_id: Set(Some(product.id)),
        description: Set(format!("Sale: {} x{}", product.name, sale.quantity)),
        amount: Set(sale.total_amount),
        category: Set(product.category.clone()),
        date: Set(sale.date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(revenue.id)
}

/// Lists every sale recorded by `user_id`, newest first.
pub async fn list_sales(db: &DatabaseConnection, user_id: &str) -> Result<Vec<sale::Model>> {
    Sale::find()
        .filter(sale::Column::UserId.eq(user_id))
        .order_by_desc(sale::Column::Date)
        .order_by_desc(sale::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
