//! Trusted price resolution. Every price on an order line comes from these queries, executed
//! inside the creation transaction; nothing a client submits is ever used as a price.
use bos_common::Cents;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CustomizationSnapshot, Product, ProductOption, Topping},
    order_objects::CartItem,
    traits::OrderFlowError,
};

/// A cart line after server-side pricing: the snapshot that will be written to `order_items`.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub customizations: Vec<CustomizationSnapshot>,
    pub line_total: Cents,
}

/// Re-price a submitted cart from catalog data. Any missing or inactive reference aborts the
/// whole cart; partial orders are never created.
pub async fn price_cart(items: &[CartItem], conn: &mut SqliteConnection) -> Result<Vec<PricedLine>, OrderFlowError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = fetch_product(item.product_id, &mut *conn)
            .await?
            .ok_or(OrderFlowError::ProductNotFound(item.product_id))?;
        if !product.active {
            return Err(OrderFlowError::ProductUnavailable(product.name));
        }
        let mut unit_price = product.price;
        let mut customizations = Vec::with_capacity(item.option_ids.len() + item.topping_ids.len());
        for option_id in &item.option_ids {
            let option = fetch_option(*option_id, product.id, &mut *conn).await?.ok_or(
                OrderFlowError::InvalidOption { product_id: product.id, option_id: *option_id },
            )?;
            unit_price = unit_price + option.price_delta;
            customizations.push(CustomizationSnapshot { name: option.name, price: option.price_delta });
        }
        for topping_id in &item.topping_ids {
            let topping = fetch_topping(*topping_id, &mut *conn).await?;
            let topping = match topping {
                Some(t) if t.active => t,
                _ => return Err(OrderFlowError::ToppingUnavailable(*topping_id)),
            };
            unit_price = unit_price + topping.price;
            customizations.push(CustomizationSnapshot { name: topping.name, price: topping.price });
        }
        let line_total = unit_price * item.quantity;
        lines.push(PricedLine {
            product_id: product.id,
            name: product.name,
            unit_price,
            quantity: item.quantity,
            customizations,
            line_total,
        });
    }
    Ok(lines)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, OrderFlowError> {
    let product = sqlx::query_as::<_, Product>("SELECT id, name, price, active FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

async fn fetch_option(
    id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductOption>, OrderFlowError> {
    let option = sqlx::query_as::<_, ProductOption>(
        "SELECT id, product_id, name, price_delta FROM product_options WHERE id = ? AND product_id = ?",
    )
    .bind(id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(option)
}

async fn fetch_topping(id: i64, conn: &mut SqliteConnection) -> Result<Option<Topping>, OrderFlowError> {
    let topping = sqlx::query_as::<_, Topping>("SELECT id, name, price, active FROM toppings WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(topping)
}
