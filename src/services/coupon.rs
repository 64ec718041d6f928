//! Coupon tracking per user (none -> pending -> used) and admin coupon management.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::entities::{
    coupon::{self, CouponState},
    coupon_tracking::{self, TrackingStatus},
};
use crate::services::{error::ShopError, ShopResult, Shop};

static COUPON_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_-]{3,32}$").expect("coupon code pattern"));

/// What an admin submits to create or edit a coupon.
#[derive(Clone, Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct CouponDraft {
    #[validate(regex(path = *COUPON_CODE, message = "code must be 3-32 of A-Z, 0-9, '_' or '-'"))]
    pub code: String,
    #[validate(range(min = 0))]
    pub min_order_value: i64,
    #[validate(range(min = 1, max = 100))]
    pub discount_percent: i32,
    #[validate(range(min = 0))]
    pub discount_max_amount: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_till: DateTime<Utc>,
}

fn validate_window(draft: &CouponDraft) -> Result<(), ValidationError> {
    if draft.valid_from < draft.valid_till {
        Ok(())
    } else {
        Err(ValidationError::new("valid_from must be before valid_till"))
    }
}

impl CouponDraft {
    fn normalized(mut self) -> Self {
        self.code = normalize_code(&self.code);
        self
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// The user's pending tracking row together with its coupon.
pub(crate) async fn pending_coupon<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> ShopResult<Option<(coupon_tracking::Model, coupon::Model)>> {
    let tracking = coupon_tracking::Entity::find()
        .filter(coupon_tracking::Column::UserId.eq(user_id))
        .filter(coupon_tracking::Column::Status.eq(TrackingStatus::Pending))
        .one(conn)
        .await?;

    match tracking {
        Some(tracking) => {
            let coupon = coupon::Entity::find_by_id(tracking.coupon_id)
                .one(conn)
                .await?
                .ok_or(ShopError::CouponNotFound(tracking.coupon_id))?;
            Ok(Some((tracking, coupon)))
        }
        None => Ok(None),
    }
}

pub async fn apply_coupon(shop: &Shop, code: &str, user_id: i32) -> ShopResult<coupon::Model> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(ShopError::Validation("coupon code must not be empty".into()));
    }

    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let coupon = coupon::Entity::find()
        .filter(coupon::Column::Code.eq(code.as_str()))
        .one(&txn)
        .await?
        .filter(|coupon| coupon.is_valid_at(Utc::now()))
        .ok_or_else(|| ShopError::InvalidCoupon(code.clone()))?;

    let already_used = coupon_tracking::Entity::find()
        .filter(coupon_tracking::Column::UserId.eq(user_id))
        .filter(coupon_tracking::Column::CouponId.eq(coupon.id))
        .filter(coupon_tracking::Column::Status.eq(TrackingStatus::Used))
        .one(&txn)
        .await?
        .is_some();
    if already_used {
        warn!(user_id, code = %coupon.code, "Rejected reuse of a consumed coupon");
        return Err(ShopError::CouponAlreadyUsed(coupon.code));
    }

    match pending_coupon(&txn, user_id).await? {
        Some((tracking, _)) if tracking.coupon_id == coupon.id => {}
        Some((tracking, previous)) => {
            let mut tracking: coupon_tracking::ActiveModel = tracking.into();
            tracking.coupon_id = Set(coupon.id);
            tracking.update(&txn).await?;
            info!(user_id, from = %previous.code, to = %coupon.code, "Swapped pending coupon");
        }
        None => {
            coupon_tracking::ActiveModel {
                coupon_id: Set(coupon.id),
                user_id: Set(user_id),
                status: Set(TrackingStatus::Pending),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            info!(user_id, code = %coupon.code, "Applied coupon");
        }
    }

    txn.commit().await?;
    Ok(coupon)
}

/// Flips the pending row to used. Runs inside the caller's checkout transaction.
pub(crate) async fn mark_used<C: ConnectionTrait>(conn: &C, user_id: i32) -> ShopResult<()> {
    let pending = coupon_tracking::Entity::find()
        .filter(coupon_tracking::Column::UserId.eq(user_id))
        .filter(coupon_tracking::Column::Status.eq(TrackingStatus::Pending))
        .one(conn)
        .await?;

    if let Some(tracking) = pending {
        let mut tracking: coupon_tracking::ActiveModel = tracking.into();
        tracking.status = Set(TrackingStatus::Used);
        tracking.update(conn).await?;
    }
    Ok(())
}

pub async fn remove_coupon(shop: &Shop, coupon_id: i32, user_id: i32) -> ShopResult<()> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let deleted = coupon_tracking::Entity::delete_many()
        .filter(coupon_tracking::Column::UserId.eq(user_id))
        .filter(coupon_tracking::Column::CouponId.eq(coupon_id))
        .filter(coupon_tracking::Column::Status.eq(TrackingStatus::Pending))
        .exec(&txn)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(ShopError::CouponNotApplied(coupon_id));
    }

    txn.commit().await?;
    info!(user_id, coupon_id, "Removed pending coupon");
    Ok(())
}

/// Coupons the user could apply at `now`: active, in their window, never used by them.
pub async fn list_available_at(
    shop: &Shop,
    user_id: i32,
    now: DateTime<Utc>,
) -> ShopResult<Vec<coupon::Model>> {
    let used: HashSet<i32> = coupon_tracking::Entity::find()
        .filter(coupon_tracking::Column::UserId.eq(user_id))
        .filter(coupon_tracking::Column::Status.eq(TrackingStatus::Used))
        .all(&shop.db)
        .await?
        .into_iter()
        .map(|tracking| tracking.coupon_id)
        .collect();

    Ok(coupon::Entity::find()
        .filter(coupon::Column::State.eq(CouponState::Active))
        .order_by_asc(coupon::Column::Id)
        .all(&shop.db)
        .await?
        .into_iter()
        .filter(|coupon| coupon.is_valid_at(now) && !used.contains(&coupon.id))
        .collect())
}

pub async fn list_available(shop: &Shop, user_id: i32) -> ShopResult<Vec<coupon::Model>> {
    list_available_at(shop, user_id, Utc::now()).await
}

// ADMIN

pub async fn list_coupons(shop: &Shop) -> ShopResult<Vec<coupon::Model>> {
    Ok(coupon::Entity::find()
        .order_by_asc(coupon::Column::Id)
        .all(&shop.db)
        .await?)
}

pub async fn create_coupon(shop: &Shop, draft: CouponDraft) -> ShopResult<coupon::Model> {
    let draft = draft.normalized();
    draft.validate()?;

    let txn = shop.db.begin().await?;
    ensure_code_free(&txn, &draft.code, None).await?;

    let created = coupon::ActiveModel {
        code: Set(draft.code),
        min_order_value: Set(draft.min_order_value),
        discount_percent: Set(draft.discount_percent),
        discount_max_amount: Set(draft.discount_max_amount),
        valid_from: Set(draft.valid_from),
        valid_till: Set(draft.valid_till),
        state: Set(CouponState::Active),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(coupon_id = created.id, code = %created.code, "Created coupon");
    Ok(created)
}

pub async fn edit_coupon(shop: &Shop, coupon_id: i32, draft: CouponDraft) -> ShopResult<coupon::Model> {
    let draft = draft.normalized();
    draft.validate()?;

    let txn = shop.db.begin().await?;
    let existing = coupon::Entity::find_by_id(coupon_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::CouponNotFound(coupon_id))?;
    ensure_code_free(&txn, &draft.code, Some(coupon_id)).await?;

    let mut coupon: coupon::ActiveModel = existing.into();
    coupon.code = Set(draft.code);
    coupon.min_order_value = Set(draft.min_order_value);
    coupon.discount_percent = Set(draft.discount_percent);
    coupon.discount_max_amount = Set(draft.discount_max_amount);
    coupon.valid_from = Set(draft.valid_from);
    coupon.valid_till = Set(draft.valid_till);
    let updated = coupon.update(&txn).await?;

    txn.commit().await?;
    info!(coupon_id, "Edited coupon");
    Ok(updated)
}

pub async fn set_coupon_state(shop: &Shop, coupon_id: i32, state: CouponState) -> ShopResult<coupon::Model> {
    let txn = shop.db.begin().await?;
    let existing = coupon::Entity::find_by_id(coupon_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::CouponNotFound(coupon_id))?;

    let mut coupon: coupon::ActiveModel = existing.into();
    coupon.state = Set(state);
    let updated = coupon.update(&txn).await?;

    txn.commit().await?;
    info!(coupon_id, state = ?state, "Changed coupon state");
    Ok(updated)
}

async fn ensure_code_free<C: ConnectionTrait>(conn: &C, code: &str, except: Option<i32>) -> ShopResult<()> {
    let mut query = coupon::Entity::find().filter(coupon::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(coupon::Column::Id.ne(id));
    }
    match query.one(conn).await? {
        Some(_) => Err(ShopError::Validation(format!("coupon code `{code}` already exists"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(code: &str, percent: i32) -> CouponDraft {
        let now = Utc::now();
        CouponDraft {
            code: code.to_owned(),
            min_order_value: 0,
            discount_percent: percent,
            discount_max_amount: 1_000,
            valid_from: now,
            valid_till: now + Duration::days(3),
        }
    }

    #[test]
    fn draft_code_is_normalized_before_validation() {
        assert!(draft(" welcome10 ", 10).normalized().validate().is_ok());
        assert!(draft("a b", 10).normalized().validate().is_err());
    }

    #[test]
    fn draft_rejects_out_of_range_percent() {
        assert!(draft("ZERO", 0).validate().is_err());
        assert!(draft("TOO_MUCH", 101).validate().is_err());
    }

    #[test]
    fn draft_rejects_inverted_window() {
        let mut inverted = draft("BACKWARDS", 10);
        std::mem::swap(&mut inverted.valid_from, &mut inverted.valid_till);
        assert!(inverted.validate().is_err());
    }
}
