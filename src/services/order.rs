//! Checkout: turns the live cart into immutable order lines in one transaction.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};

use crate::entities::{
    cart,
    order::{self, Status},
    payment_method::{self, PaymentKind},
    user,
    wallet_transaction::TransactionReason,
};
use crate::services::{
    coupon, error::ShopError, payment, pricing::{self, PricedCart}, wallet, ShopResult, Shop,
};

/// Pre-check for wallet checkout: the wallet must cover the current payable total.
pub async fn validate_wallet_payment(shop: &Shop, user_id: i32) -> ShopResult<PricedCart> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let priced = pricing::price_cart_on(&txn, user_id, Utc::now()).await?;
    let wallet = wallet::ensure_wallet(&txn, user_id).await?;
    if wallet.balance < priced.payable_total {
        return Err(ShopError::InsufficientBalance {
            balance: wallet.balance,
            required: priced.payable_total,
        });
    }

    txn.commit().await?;
    Ok(priced)
}

pub async fn confirm_order(shop: &Shop, user_id: i32, payment_method_id: i32) -> ShopResult<Vec<order::Model>> {
    let _guard = shop.locks.lock(user_id).await;
    let now = Utc::now();
    let txn = shop.db.begin().await?;

    let customer = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::UserNotFound(user_id))?;
    let address_id = customer.default_address_id.ok_or(ShopError::NoAddress)?;

    let method = payment_method::Entity::find_by_id(payment_method_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::PaymentMethodNotFound(payment_method_id))?;

    // Fails with CouponExpired when the pending coupon lapsed since it was applied.
    let priced = pricing::price_cart_on(&txn, user_id, now).await?;
    if priced.lines.is_empty() {
        return Err(ShopError::EmptyCart);
    }
    let coupon_id = priced.coupon.as_ref().map(|coupon| coupon.id);

    match method.kind {
        PaymentKind::CashOnDelivery => {}
        PaymentKind::Online => payment::consume_verified(&txn, user_id, priced.payable_total).await?,
        PaymentKind::Wallet => {
            if priced.payable_total > 0 {
                wallet::debit_on(&txn, user_id, priced.payable_total, TransactionReason::OrderPayment).await?;
            }
        }
    }

    let mut created = Vec::with_capacity(priced.lines.len());
    for line in &priced.lines {
        let order_line = order::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(line.product_id),
            address_id: Set(address_id),
            payment_method_id: Set(method.id),
            status: Set(Status::Pending),
            coupon_id: Set(coupon_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created.push(order_line);
    }

    coupon::mark_used(&txn, user_id).await?;

    cart::Entity::delete_many()
        .filter(cart::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    info!(
        user_id,
        lines = created.len(),
        subtotal = priced.subtotal,
        discount = priced.discount,
        payable = priced.payable_total,
        payment = ?method.kind,
        "Confirmed order"
    );
    Ok(created)
}

/// The user's order lines, newest first.
pub async fn list_orders(shop: &Shop, user_id: i32) -> ShopResult<Vec<order::Model>> {
    Ok(order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::Id)
        .all(&shop.db)
        .await?)
}

pub async fn get_order(shop: &Shop, user_id: i32, order_id: i32) -> ShopResult<order::Model> {
    order::Entity::find_by_id(order_id)
        .filter(order::Column::UserId.eq(user_id))
        .one(&shop.db)
        .await?
        .ok_or(ShopError::OrderNotFound(order_id))
}

pub async fn list_all_orders(shop: &Shop) -> ShopResult<Vec<order::Model>> {
    Ok(order::Entity::find()
        .order_by_desc(order::Column::Id)
        .all(&shop.db)
        .await?)
}

/// Admin fulfilment update. Any of pending/shipped/delivered may be set while
/// the line is still live; cancellation and return go through the refund path.
pub async fn update_order_status(shop: &Shop, order_id: i32, status: Status) -> ShopResult<order::Model> {
    if status.is_terminal() {
        return Err(ShopError::Validation(format!(
            "status `{status}` can only be reached by cancelling or returning"
        )));
    }

    let txn = shop.db.begin().await?;
    let existing = order::Entity::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::OrderNotFound(order_id))?;
    if existing.status.is_terminal() {
        warn!(order_id, status = %existing.status, "Rejected status update on closed order");
        return Err(ShopError::OrderNotUpdatable {
            id: order_id,
            status: existing.status,
        });
    }

    let previous = existing.status;
    let mut line: order::ActiveModel = existing.into();
    line.status = Set(status);
    let updated = line.update(&txn).await?;

    txn.commit().await?;
    info!(order_id, from = %previous, to = %status, "Updated order status");
    Ok(updated)
}
