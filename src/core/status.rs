//! Stock and status reconciliation.
//!
//! A product's stored status and its stock counters can disagree: a sold-out product may be
//! restocked, or a product may be depleted while still marked `selling`. Every read path
//! (owner listings, the public catalog, edit screens) and the sale recorder derive the
//! displayed status through [`effective_status`], so they can never diverge.

use crate::entities::{ProductStatus, product};

/// Units left to sell, floored at zero.
///
/// `quantity_sold` may transiently exceed `quantity` in the store; business logic never
/// sees a negative stock.
#[must_use]
pub const fn available_stock(quantity: i32, quantity_sold: i32) -> i32 {
    let available = quantity.saturating_sub(quantity_sold);
    if available < 0 { 0 } else { available }
}

/// Derives the displayed lifecycle status from the stored status and stock counters.
///
/// Rules, in order:
/// 1. `purchased` and `shipping` are returned unchanged.
/// 2. No stock left means `sold`.
/// 3. Stock on a product stored as `sold` means it was restocked: `selling`.
/// 4. Anything else keeps its stored status.
#[must_use]
pub const fn effective_status(
    stored: ProductStatus,
    quantity: i32,
    quantity_sold: i32,
) -> ProductStatus {
    let available = available_stock(quantity, quantity_sold);
    if stored.is_pre_sale() {
        return stored;
    }
    if available <= 0 {
        return ProductStatus::Sold;
    }
    match stored {
        ProductStatus::Sold => ProductStatus::Selling,
        other => other,
    }
}

/// Status to persist after a sale moved `quantity_sold` forward.
///
/// A depleted product becomes `sold`. A product that still has stock and was `received`
/// (or stale `sold`) is now on sale. Pre-sale products keep their status until edited.
#[must_use]
pub const fn status_after_sale(
    stored: ProductStatus,
    quantity: i32,
    quantity_sold: i32,
) -> ProductStatus {
    if available_stock(quantity, quantity_sold) <= 0 {
        return ProductStatus::Sold;
    }
    match stored {
        ProductStatus::Received | ProductStatus::Sold => ProductStatus::Selling,
        other => other,
    }
}

/// Whether a product belongs in the public catalog: public, on sale, and in stock.
#[must_use]
pub fn should_appear(product: &product::Model) -> bool {
    product.is_public
        && effective_status(product.status, product.quantity, product.quantity_sold)
            == ProductStatus::Selling
        && available_stock(product.quantity, product.quantity_sold) > 0
}
