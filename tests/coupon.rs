mod common;

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use storefront::entities::{
    coupon::CouponState,
    coupon_tracking::{self, TrackingStatus},
    payment_method,
};
use storefront::services::{coupon, coupon::CouponDraft, order, pricing, ErrorKind};
use storefront::{Shop, ShopError};

async fn tracking_rows(shop: &Shop, user_id: i32) -> Vec<coupon_tracking::Model> {
    coupon_tracking::Entity::find()
        .filter(coupon_tracking::Column::UserId.eq(user_id))
        .all(&shop.db)
        .await
        .unwrap()
}

fn pending(rows: &[coupon_tracking::Model]) -> Vec<&coupon_tracking::Model> {
    rows.iter()
        .filter(|row| row.status == TrackingStatus::Pending)
        .collect()
}

#[tokio::test]
async fn test_apply_same_coupon_twice_is_idempotent() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    common::coupon(&shop, "WELCOME", 0, 5, 1_000).await;

    coupon::apply_coupon(&shop, "WELCOME", buyer.id).await.unwrap();
    coupon::apply_coupon(&shop, "welcome", buyer.id).await.unwrap();

    assert_eq!(tracking_rows(&shop, buyer.id).await.len(), 1);
}

#[tokio::test]
async fn test_applying_second_coupon_swaps_pending_row() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let first = common::coupon(&shop, "FIRST", 0, 5, 1_000).await;
    let second = common::coupon(&shop, "SECOND", 0, 10, 1_000).await;

    coupon::apply_coupon(&shop, "FIRST", buyer.id).await.unwrap();
    let before = tracking_rows(&shop, buyer.id).await;
    coupon::apply_coupon(&shop, "SECOND", buyer.id).await.unwrap();
    let after = tracking_rows(&shop, buyer.id).await;

    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[0].coupon_id, second.id);
    assert_ne!(after[0].coupon_id, first.id);
}

#[tokio::test]
async fn test_unknown_blocked_or_expired_coupon_is_invalid() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let blocked = common::coupon(&shop, "BLOCKED", 0, 5, 1_000).await;
    coupon::set_coupon_state(&shop, blocked.id, CouponState::Blocked)
        .await
        .unwrap();
    let expired = common::coupon(&shop, "OLD", 0, 5, 1_000).await;
    common::expire(&shop, expired.id).await;

    for code in ["NOPE", "BLOCKED", "OLD"] {
        let err = coupon::apply_coupon(&shop, code, buyer.id).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidCoupon(_)), "{code}: {err:?}");
    }

    let err = coupon::apply_coupon(&shop, "   ", buyer.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(tracking_rows(&shop, buyer.id).await.is_empty());
}

#[tokio::test]
async fn test_remove_coupon() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let applied = common::coupon(&shop, "REMOVE", 0, 5, 1_000).await;
    let other = common::coupon(&shop, "OTHER", 0, 5, 1_000).await;

    coupon::apply_coupon(&shop, "REMOVE", buyer.id).await.unwrap();

    let err = coupon::remove_coupon(&shop, other.id, buyer.id).await.unwrap_err();
    assert!(matches!(err, ShopError::CouponNotApplied(id) if id == other.id));

    coupon::remove_coupon(&shop, applied.id, buyer.id).await.unwrap();
    assert!(tracking_rows(&shop, buyer.id).await.is_empty());

    let err = coupon::remove_coupon(&shop, applied.id, buyer.id).await.unwrap_err();
    assert!(matches!(err, ShopError::CouponNotApplied(_)));
}

#[tokio::test]
async fn test_used_coupon_cannot_be_reapplied() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let mug = common::product(&shop, "Mug", 10_000).await;
    common::coupon(&shop, "ONCE", 0, 10, 5_000).await;

    common::add_to_cart(&shop, buyer.id, mug.id, 1).await;
    coupon::apply_coupon(&shop, "ONCE", buyer.id).await.unwrap();
    order::confirm_order(&shop, buyer.id, payment_method::CASH_ON_DELIVERY)
        .await
        .unwrap();

    let rows = tracking_rows(&shop, buyer.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TrackingStatus::Used);

    let err = coupon::apply_coupon(&shop, "ONCE", buyer.id).await.unwrap_err();
    assert!(matches!(err, ShopError::CouponAlreadyUsed(_)));

    // The next cart is priced without it.
    common::add_to_cart(&shop, buyer.id, mug.id, 1).await;
    let priced = pricing::price_cart(&shop, buyer.id).await.unwrap();
    assert_eq!(priced.discount, 0);
    assert!(priced.coupon.is_none());
}

#[tokio::test]
async fn test_list_available_excludes_used_blocked_and_expired() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let mug = common::product(&shop, "Mug", 10_000).await;
    let used = common::coupon(&shop, "USED", 0, 10, 5_000).await;
    let open = common::coupon(&shop, "OPEN", 0, 10, 5_000).await;
    let blocked = common::coupon(&shop, "SHUT", 0, 10, 5_000).await;
    let expired = common::coupon(&shop, "GONE", 0, 10, 5_000).await;
    coupon::set_coupon_state(&shop, blocked.id, CouponState::Blocked)
        .await
        .unwrap();
    common::expire(&shop, expired.id).await;

    common::add_to_cart(&shop, buyer.id, mug.id, 1).await;
    coupon::apply_coupon(&shop, "USED", buyer.id).await.unwrap();
    order::confirm_order(&shop, buyer.id, payment_method::CASH_ON_DELIVERY)
        .await
        .unwrap();

    let ids: Vec<i32> = coupon::list_available(&shop, buyer.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![open.id]);

    // Somebody else still sees the coupon this buyer consumed.
    let other = common::customer(&shop, "other").await;
    let ids: Vec<i32> = coupon::list_available(&shop, other.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![used.id, open.id]);
}

#[tokio::test]
async fn test_single_pending_coupon_under_concurrent_applies() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let codes = ["ALPHA", "BRAVO", "CHARLIE", "DELTA"];
    for code in codes {
        common::coupon(&shop, code, 0, 5, 1_000).await;
    }

    let buyer_id = buyer.id;
    let mut handles = Vec::new();
    for code in codes {
        let shop = shop.clone();
        handles.push(tokio::spawn(async move {
            coupon::apply_coupon(&shop, code, buyer_id).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let rows = tracking_rows(&shop, buyer.id).await;
    assert_eq!(pending(&rows).len(), 1);
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_admin_coupon_lifecycle() {
    let shop = common::shop().await;
    let now = Utc::now();
    let draft = CouponDraft {
        code: "spring-25".to_owned(),
        min_order_value: 10_000,
        discount_percent: 25,
        discount_max_amount: 2_500,
        valid_from: now - Duration::hours(1),
        valid_till: now + Duration::days(30),
    };

    let created = coupon::create_coupon(&shop, draft.clone()).await.unwrap();
    assert_eq!(created.code, "SPRING-25");
    assert_eq!(created.state, CouponState::Active);

    let err = coupon::create_coupon(&shop, draft.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let edited = coupon::edit_coupon(
        &shop,
        created.id,
        CouponDraft {
            discount_percent: 30,
            ..draft.clone()
        },
    )
    .await
    .unwrap();
    assert_eq!(edited.discount_percent, 30);

    let blocked = coupon::set_coupon_state(&shop, created.id, CouponState::Blocked)
        .await
        .unwrap();
    assert_eq!(blocked.state, CouponState::Blocked);
    let unblocked = coupon::set_coupon_state(&shop, created.id, CouponState::Active)
        .await
        .unwrap();
    assert_eq!(unblocked.state, CouponState::Active);

    let err = coupon::edit_coupon(&shop, 9_999, draft).await.unwrap_err();
    assert!(matches!(err, ShopError::CouponNotFound(9_999)));
    assert_eq!(coupon::list_coupons(&shop).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blocking_pending_coupon_fails_pricing() {
    let shop = common::shop().await;
    let buyer = common::customer(&shop, "buyer").await;
    let mug = common::product(&shop, "Mug", 10_000).await;
    let promo = common::coupon(&shop, "PROMO", 0, 10, 5_000).await;

    common::add_to_cart(&shop, buyer.id, mug.id, 1).await;
    coupon::apply_coupon(&shop, "PROMO", buyer.id).await.unwrap();
    coupon::set_coupon_state(&shop, promo.id, CouponState::Blocked)
        .await
        .unwrap();

    let err = pricing::price_cart(&shop, buyer.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);
}
