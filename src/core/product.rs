//! Product business logic - typed access to a user's inventory.
//!
//! This module provides functions for creating, retrieving, updating, and deleting products,
//! plus the listings that attach the derived stock fields (`availableStock`,
//! `effectiveStatus`) every read path needs. Stock counters are only moved forward by the
//! sale recorder; explicit edits here may set them directly but never to an inconsistent
//! pair.

use crate::{
    core::status::{available_stock, effective_status, should_appear},
    entities::{Product, ProductStatus, Sale, product, sale},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fields needed to register a purchased product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub selling_price: f64,
    pub purchase_price: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub other_costs: f64,
    /// Defaults to `purchased`
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub is_public: bool,
}

/// Explicit edit of a product; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub quantity_sold: Option<i32>,
    pub selling_price: Option<f64>,
    pub purchase_price: Option<f64>,
    pub shipping_cost: Option<f64>,
    pub other_costs: Option<f64>,
    pub status: Option<ProductStatus>,
    pub is_public: Option<bool>,
}

/// A product together with the fields derived from its stock counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: product::Model,
    pub available_stock: i32,
    pub effective_status: ProductStatus,
    /// Purchase price plus shipping and other per-unit costs
    pub unit_cost: f64,
}

impl From<product::Model> for ProductView {
    fn from(product: product::Model) -> Self {
        Self {
            available_stock: available_stock(product.quantity, product.quantity_sold),
            effective_status: effective_status(
                product.status,
                product.quantity,
                product.quantity_sold,
            ),
            unit_cost: crate::core::round2(
                product.purchase_price + product.shipping_cost + product.other_costs,
            ),
            product,
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_money(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

fn require_counters(quantity: i32, quantity_sold: i32) -> Result<()> {
    if quantity < 0 || quantity_sold < 0 {
        return Err(Error::validation("stock counters cannot be negative"));
    }
    if quantity_sold > quantity {
        return Err(Error::validation(format!(
            "quantitySold ({quantity_sold}) cannot exceed quantity ({quantity})"
        )));
    }
    Ok(())
}

/// Creates a product owned by `user_id`.
///
/// # Errors
/// Returns [`Error::Validation`] for blank names or categories, negative quantities, or
/// negative/non-finite prices.
pub async fn create_product(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewProduct,
) -> Result<product::Model> {
    require_text("name", &new.name)?;
    require_text("category", &new.category)?;
    require_counters(new.quantity, 0)?;
    require_money("sellingPrice", new.selling_price)?;
    require_money("purchasePrice", new.purchase_price)?;
    require_money("shippingCost", new.shipping_cost)?;
    require_money("otherCosts", new.other_costs)?;

    let now = Utc::now();
    let model = product::ActiveModel {
        user_id: Set(user_id.to_string()),
        name: Set(new.name.trim().to_string()),
        category: Set(new.category.trim().to_string()),
        quantity: Set(new.quantity),
        quantity_sold: Set(0),
        selling_price: Set(new.selling_price),
        purchase_price: Set(new.purchase_price),
        shipping_cost: Set(new.shipping_cost),
        other_costs: Set(new.other_costs),
        status: Set(new.status.unwrap_or(ProductStatus::Purchased)),
        is_public: Set(new.is_public),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let product = model.insert(db).await?;
    info!(product_id = product.id, user_id, "Created product");
    Ok(product)
}

/// Loads a product, treating products owned by someone else as absent.
pub async fn get_product_for_user<C>(
    db: &C,
    user_id: &str,
    product_id: i64,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .filter(product::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))
}

/// Applies an explicit edit to a product.
///
/// # Errors
/// Returns [`Error::NotFound`] if the product is absent or not owned by `user_id`, and
/// [`Error::Validation`] if the edit leaves `quantity_sold` above `quantity`.
pub async fn update_product(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    patch: ProductPatch,
) -> Result<product::Model> {
    let existing = get_product_for_user(db, user_id, product_id).await?;

    let quantity = patch.quantity.unwrap_or(existing.quantity);
    let quantity_sold = patch.quantity_sold.unwrap_or(existing.quantity_sold);
    require_counters(quantity, quantity_sold)?;

    let mut active: product::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        require_text("name", &name)?;
        active.name = Set(name.trim().to_string());
    }
    if let Some(category) = patch.category {
        require_text("category", &category)?;
        active.category = Set(category.trim().to_string());
    }
    for (field, value, target) in [
        ("sellingPrice", patch.selling_price, &mut active.selling_price),
        ("purchasePrice", patch.purchase_price, &mut active.purchase_price),
        ("shippingCost", patch.shipping_cost, &mut active.shipping_cost),
        ("otherCosts", patch.other_costs, &mut active.other_costs),
    ] {
        if let Some(value) = value {
            require_money(field, value)?;
            *target = Set(value);
        }
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if let Some(is_public) = patch.is_public {
        active.is_public = Set(is_public);
    }
    active.quantity = Set(quantity);
    active.quantity_sold = Set(quantity_sold);
    active.updated_at = Set(Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Deletes a product that no sale references.
///
/// # Errors
/// Returns [`Error::Conflict`] while any sale still references the product.
pub async fn delete_product(db: &DatabaseConnection, user_id: &str, product_id: i64) -> Result<()> {
    let product = get_product_for_user(db, user_id, product_id).await?;

    let sales = Sale::find()
        .filter(sale::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    if sales > 0 {
        return Err(Error::Conflict {
            message: format!("product {product_id} is referenced by {sales} sale(s)"),
        });
    }

    product.delete(db).await?;
    info!(product_id, user_id, "Deleted product");
    Ok(())
}

/// Lists every product owned by `user_id`, newest first, with derived stock fields.
pub async fn list_products(db: &DatabaseConnection, user_id: &str) -> Result<Vec<ProductView>> {
    let products = Product::find()
        .filter(product::Column::UserId.eq(user_id))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await?;
    Ok(products.into_iter().map(ProductView::from).collect())
}

/// Lists the products of `user_id` that belong in the public catalog, by name.
pub async fn list_catalog(db: &DatabaseConnection, user_id: &str) -> Result<Vec<ProductView>> {
    let products = Product::find()
        .filter(product::Column::UserId.eq(user_id))
        .filter(product::Column::IsPublic.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await?;
    Ok(products
        .into_iter()
        .filter(should_appear)
        .map(ProductView::from)
        .collect())
}
