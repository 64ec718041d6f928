//! Cancellation and return. The status change and any wallet credit commit
//! together or not at all.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::entities::{
    coupon,
    order::{self, Status},
    payment_method,
    wallet_transaction::TransactionReason,
};
use crate::services::{
    error::ShopError,
    pricing::{amount_overflow, round_minor},
    wallet, ShopResult, Shop,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Refund {
    pub order: order::Model,
    pub refund_amount: i64,
    /// Whether `refund_amount` went to the wallet. Cash orders never captured anything.
    pub credited: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reversal {
    Cancel,
    Return,
}

/// Share of the coupon discount carried by one line of a multi-line checkout.
///
/// The discount is recomputed from the raw percentage over every line that
/// shares the coupon and split evenly; the coupon's max amount is not applied.
pub fn prorated_discount_share(line_prices: &[i64], discount_percent: i32) -> i64 {
    if line_prices.is_empty() {
        return 0;
    }
    let total: Decimal = line_prices.iter().copied().map(Decimal::from).sum();
    let discount = total * Decimal::from(discount_percent) / Decimal::ONE_HUNDRED;
    round_minor(discount / Decimal::from(line_prices.len()))
}

/// What goes back to the customer for `line`, before deciding whether to credit it.
async fn refund_amount<C: ConnectionTrait>(
    conn: &C,
    line: &order::Model,
    refundable: bool,
) -> ShopResult<i64> {
    let price = line.price().ok_or_else(amount_overflow)?;
    let coupon_id = match line.coupon_id {
        Some(coupon_id) if refundable => coupon_id,
        _ => return Ok(price),
    };

    let coupon = coupon::Entity::find_by_id(coupon_id)
        .one(conn)
        .await?
        .ok_or(ShopError::CouponNotFound(coupon_id))?;

    // A coupon is consumed once per user, so user + coupon is exactly one checkout.
    let siblings = order::Entity::find()
        .filter(order::Column::UserId.eq(line.user_id))
        .filter(order::Column::CouponId.eq(coupon_id))
        .all(conn)
        .await?
        .iter()
        .map(|sibling| sibling.price().ok_or_else(amount_overflow))
        .collect::<ShopResult<Vec<i64>>>()?;

    let share = prorated_discount_share(&siblings, coupon.discount_percent);
    Ok(price.saturating_sub(share).max(0))
}

async fn reverse(shop: &Shop, order_id: i32, owner: Option<i32>, reversal: Reversal) -> ShopResult<Refund> {
    let user_id = match owner {
        Some(user_id) => user_id,
        None => {
            order::Entity::find_by_id(order_id)
                .one(&shop.db)
                .await?
                .ok_or(ShopError::OrderNotFound(order_id))?
                .user_id
        }
    };

    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let line = order::Entity::find_by_id(order_id)
        .filter(order::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(ShopError::OrderNotFound(order_id))?;

    // A window too large to represent never closes.
    let return_deadline = Duration::try_days(shop.policy.return_window_days)
        .and_then(|window| line.created_at.checked_add_signed(window));

    match reversal {
        Reversal::Cancel if !line.status.can_cancel() => {
            warn!(order_id, status = %line.status, "Rejected cancellation");
            return Err(ShopError::OrderNotCancellable {
                id: order_id,
                status: line.status,
            });
        }
        Reversal::Return if !line.status.can_return() => {
            warn!(order_id, status = %line.status, "Rejected return");
            return Err(ShopError::OrderNotReturnable {
                id: order_id,
                status: line.status,
            });
        }
        Reversal::Return if return_deadline.is_some_and(|deadline| Utc::now() > deadline) => {
            warn!(order_id, created_at = %line.created_at, "Rejected return outside window");
            return Err(ShopError::ReturnWindowExpired(order_id));
        }
        _ => {}
    }

    let method = payment_method::Entity::find_by_id(line.payment_method_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::PaymentMethodNotFound(line.payment_method_id))?;
    let refundable = method.kind.is_refundable();
    let amount = refund_amount(&txn, &line, refundable).await?;

    let mut active: order::ActiveModel = line.into();
    active.status = Set(match reversal {
        Reversal::Cancel => Status::Cancelled,
        Reversal::Return => Status::Returned,
    });
    let updated = active.update(&txn).await?;

    let credited = refundable && amount > 0;
    if credited {
        wallet::credit_on(&txn, user_id, amount, TransactionReason::Refund).await?;
    }

    txn.commit().await?;
    info!(
        order_id,
        user_id,
        status = %updated.status,
        refund = amount,
        credited,
        "Reversed order line"
    );
    Ok(Refund {
        order: updated,
        refund_amount: amount,
        credited,
    })
}

pub async fn cancel_order(shop: &Shop, user_id: i32, order_id: i32) -> ShopResult<Refund> {
    reverse(shop, order_id, Some(user_id), Reversal::Cancel).await
}

pub async fn return_order(shop: &Shop, user_id: i32, order_id: i32) -> ShopResult<Refund> {
    reverse(shop, order_id, Some(user_id), Reversal::Return).await
}

/// Cancels on the customer's behalf; no ownership check.
pub async fn admin_cancel_order(shop: &Shop, order_id: i32) -> ShopResult<Refund> {
    reverse(shop, order_id, None, Reversal::Cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_line_order_splits_raw_percentage_evenly() {
        // (100 + 200) * 10% / 2
        assert_eq!(prorated_discount_share(&[100, 200], 10), 15);
        assert_eq!(100 - prorated_discount_share(&[100, 200], 10), 85);
    }

    #[test]
    fn single_line_carries_the_whole_discount() {
        assert_eq!(prorated_discount_share(&[50_000], 10), 5_000);
    }

    #[test]
    fn share_of_huge_lines_does_not_overflow() {
        assert_eq!(prorated_discount_share(&[i64::MAX, i64::MAX], 0), 0);
    }

    #[test]
    fn no_lines_no_share() {
        assert_eq!(prorated_discount_share(&[], 10), 0);
    }
}
