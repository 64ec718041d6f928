//! Cart pricing. Nothing here writes; a price is recomputed from stored state
//! every time it is asked for.

use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::entities::{cart, coupon};
use crate::services::{coupon::pending_coupon, error::ShopError, ShopResult, Shop};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricedLine {
    pub cart_line_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppliedCoupon {
    pub id: i32,
    pub code: String,
    pub discount_percent: i32,
    pub discount_max_amount: i64,
    pub min_order_value: i64,
}

impl From<&coupon::Model> for AppliedCoupon {
    fn from(coupon: &coupon::Model) -> Self {
        Self {
            id: coupon.id,
            code: coupon.code.clone(),
            discount_percent: coupon.discount_percent,
            discount_max_amount: coupon.discount_max_amount,
            min_order_value: coupon.min_order_value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: i64,
    pub discount: i64,
    pub payable_total: i64,
    pub coupon: Option<AppliedCoupon>,
}

/// `amount * percent / 100`, rounded half away from zero to the minor unit.
pub fn percent_of(amount: i64, percent: i32) -> i64 {
    round_minor(Decimal::from(amount) * Decimal::from(percent) / Decimal::ONE_HUNDRED)
}

pub(crate) fn amount_overflow() -> ShopError {
    ShopError::Validation("amount exceeds the supported range".into())
}

/// Sums minor-unit amounts, failing instead of wrapping.
pub(crate) fn checked_sum(amounts: impl IntoIterator<Item = i64>) -> ShopResult<i64> {
    amounts
        .into_iter()
        .try_fold(0i64, |total, amount| total.checked_add(amount))
        .ok_or_else(amount_overflow)
}

pub(crate) fn round_minor(value: Decimal) -> i64 {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() { i64::MIN } else { i64::MAX })
}

/// Discount `coupon` grants on `subtotal`: zero until the subtotal is strictly
/// above the minimum, then the percentage capped by the max amount and by the
/// subtotal itself.
pub fn coupon_discount(subtotal: i64, coupon: &coupon::Model) -> i64 {
    if subtotal <= coupon.min_order_value {
        return 0;
    }
    percent_of(subtotal, coupon.discount_percent)
        .min(coupon.discount_max_amount)
        .min(subtotal)
        .max(0)
}

/// Prices `lines` against an optional pending coupon as of `now`.
pub fn price_lines(
    lines: &[cart::Model],
    coupon: Option<&coupon::Model>,
    now: DateTime<Utc>,
) -> ShopResult<PricedCart> {
    let priced = lines
        .iter()
        .map(|line| -> ShopResult<PricedLine> {
            Ok(PricedLine {
                cart_line_id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total().ok_or_else(amount_overflow)?,
            })
        })
        .collect::<ShopResult<Vec<PricedLine>>>()?;
    let subtotal = checked_sum(priced.iter().map(|line| line.line_total))?;

    let discount = match coupon {
        None => 0,
        Some(coupon) if !coupon.is_valid_at(now) => {
            return Err(ShopError::CouponExpired(coupon.code.clone()));
        }
        Some(coupon) => coupon_discount(subtotal, coupon),
    };

    Ok(PricedCart {
        lines: priced,
        subtotal,
        discount,
        payable_total: (subtotal - discount).max(0),
        coupon: coupon.map(AppliedCoupon::from),
    })
}

pub(crate) async fn cart_lines<C: ConnectionTrait>(conn: &C, user_id: i32) -> ShopResult<Vec<cart::Model>> {
    Ok(cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .order_by_asc(cart::Column::Id)
        .all(conn)
        .await?)
}

/// Prices the user's live cart on `conn`, which may be an open transaction.
pub(crate) async fn price_cart_on<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    now: DateTime<Utc>,
) -> ShopResult<PricedCart> {
    let lines = cart_lines(conn, user_id).await?;
    let pending = pending_coupon(conn, user_id).await?;
    price_lines(&lines, pending.as_ref().map(|(_, coupon)| coupon), now)
}

pub async fn price_cart(shop: &Shop, user_id: i32) -> ShopResult<PricedCart> {
    price_cart_on(&shop.db, user_id, Utc::now()).await
}
