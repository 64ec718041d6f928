#![allow(dead_code)]

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, EntityTrait, Set};
use std::sync::Arc;

use storefront::entities::{
    address,
    coupon::{self, CouponState},
    primary_settup, product, setup_schema, user,
};
use storefront::services::{cart, SandboxGateway};
use storefront::{Policy, Shop};

/// Fresh in-memory store. One pooled connection, so every query sees the same database.
pub async fn shop() -> Shop {
    shop_with_policy(Policy::default()).await
}

pub async fn shop_with_policy(policy: Policy) -> Shop {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    primary_settup(&db, None).await.expect("Failed to seed");
    Shop::new(db, Arc::new(SandboxGateway), policy)
}

pub async fn user_without_address(shop: &Shop, username: &str) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_owned()),
        password: Set("not-a-hash".to_owned()),
        role: Set(user::Role::User),
        ..Default::default()
    }
    .insert(&shop.db)
    .await
    .expect("Failed to create user")
}

/// A customer with a default delivery address.
pub async fn customer(shop: &Shop, username: &str) -> user::Model {
    let created = user_without_address(shop, username).await;
    let home = address::ActiveModel {
        user_id: Set(created.id),
        line: Set(format!("{username} street 1")),
        ..Default::default()
    }
    .insert(&shop.db)
    .await
    .expect("Failed to create address");

    let mut active: user::ActiveModel = created.into();
    active.default_address_id = Set(Some(home.id));
    active.update(&shop.db).await.expect("Failed to set address")
}

pub async fn product(shop: &Shop, name: &str, price: i64) -> product::Model {
    product::ActiveModel {
        name: Set(name.to_owned()),
        price: Set(price),
        is_available: Set(true),
        ..Default::default()
    }
    .insert(&shop.db)
    .await
    .expect("Failed to create product")
}

/// Active coupon valid from yesterday until tomorrow.
pub async fn coupon(shop: &Shop, code: &str, min: i64, percent: i32, max: i64) -> coupon::Model {
    let now = Utc::now();
    coupon::ActiveModel {
        code: Set(code.to_owned()),
        min_order_value: Set(min),
        discount_percent: Set(percent),
        discount_max_amount: Set(max),
        valid_from: Set(now - Duration::days(1)),
        valid_till: Set(now + Duration::days(1)),
        state: Set(CouponState::Active),
        ..Default::default()
    }
    .insert(&shop.db)
    .await
    .expect("Failed to create coupon")
}

/// Moves a coupon's window into the past.
pub async fn expire(shop: &Shop, coupon_id: i32) {
    let existing = coupon::Entity::find_by_id(coupon_id)
        .one(&shop.db)
        .await
        .unwrap()
        .expect("coupon exists");
    let mut active: coupon::ActiveModel = existing.into();
    active.valid_till = Set(Utc::now() - Duration::minutes(1));
    active.update(&shop.db).await.expect("Failed to expire coupon");
}

pub async fn add_to_cart(shop: &Shop, user_id: i32, product_id: i32, quantity: i32) {
    cart::add_product(shop, user_id, product_id, quantity)
        .await
        .expect("Failed to add to cart");
}
