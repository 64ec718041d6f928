//! Cart mutations. Every change runs under the user's lock so it cannot
//! interleave with a checkout of the same cart.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use crate::entities::{cart, product};
use crate::services::{error::ShopError, pricing::amount_overflow, ShopResult, Shop};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

fn ensure_line_fits(unit_price: i64, quantity: i32) -> ShopResult<()> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(ShopError::Validation(format!(
            "Quantity must not exceed {MAX_LINE_QUANTITY}"
        )));
    }
    unit_price
        .checked_mul(i64::from(quantity))
        .map(|_| ())
        .ok_or_else(amount_overflow)
}

pub async fn add_product(shop: &Shop, user_id: i32, product_id: i32, quantity: i32) -> ShopResult<cart::Model> {
    if quantity <= 0 {
        return Err(ShopError::Validation("Quantity should be greater than 0".into()));
    }

    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let product = product::Entity::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::ProductNotFound(product_id))?;
    if !product.is_available {
        return Err(ShopError::ProductUnavailable(product_id));
    }

    //If entry already exist in db, so we would expand it, instead of creating second one.
    let existing = cart::Entity::find()
        .filter(cart::Column::ProductId.eq(product_id))
        .filter(cart::Column::UserId.eq(user_id))
        .one(&txn)
        .await?;

    let entry = match existing {
        Some(entry) => {
            let total = entry
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| ShopError::Validation("Quantity is too large".into()))?;
            ensure_line_fits(entry.unit_price, total)?;
            let mut entry: cart::ActiveModel = entry.into();
            entry.quantity = Set(total);
            entry.update(&txn).await?
        }
        None => {
            ensure_line_fits(product.price, quantity)?;
            cart::ActiveModel {
                user_id: Set(user_id),
                product_id: Set(product_id),
                unit_price: Set(product.price),
                quantity: Set(quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    info!(user_id, product_id, quantity = entry.quantity, "Updated cart");
    Ok(entry)
}

/// Sets a line's quantity; zero removes the line. Returns `None` when removed.
pub async fn set_quantity(shop: &Shop, user_id: i32, entry_id: i32, quantity: i32) -> ShopResult<Option<cart::Model>> {
    if quantity < 0 {
        return Err(ShopError::Validation("Quantity must not be negative".into()));
    }

    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let entry = cart::Entity::find_by_id(entry_id)
        .filter(cart::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(ShopError::CartEntryNotFound(entry_id))?;

    if quantity > 0 {
        ensure_line_fits(entry.unit_price, quantity)?;
    }

    let mut entry: cart::ActiveModel = entry.into();
    let result = if quantity == 0 {
        entry.delete(&txn).await?;
        None
    } else {
        entry.quantity = Set(quantity);
        Some(entry.update(&txn).await?)
    };

    txn.commit().await?;
    Ok(result)
}

pub async fn remove_product(shop: &Shop, user_id: i32, entry_id: i32) -> ShopResult<()> {
    set_quantity(shop, user_id, entry_id, 0).await.map(|_| ())
}
