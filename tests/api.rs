mod common;

use reqwest::{Client, StatusCode};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use storefront::entities::{hash_password, payment_method, user};
use storefront::{create_api_router, Shop};

const PASSWORD: &str = "correct horse";

/// Serves the router on an ephemeral port and returns its base url.
async fn serve(shop: Shop) -> String {
    let app = create_api_router(Arc::new(shop), Arc::from("test-secret"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn with_password(shop: &Shop, created: user::Model, role: user::Role) -> user::Model {
    let mut active: user::ActiveModel = created.into();
    active.password = Set(hash_password(PASSWORD).unwrap());
    active.role = Set(role);
    active.update(&shop.db).await.unwrap()
}

async fn login(client: &Client, base: &str, username: &str) -> String {
    let response = client
        .post(format!("{base}/login"))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let shop = common::shop().await;
    let created = common::customer(&shop, "buyer").await;
    with_password(&shop, created, user::Role::User).await;
    let base = serve(shop).await;

    let response = Client::new()
        .post(format!("{base}/login"))
        .json(&json!({ "username": "buyer", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_routes_require_token_and_role() {
    let shop = common::shop().await;
    let created = common::customer(&shop, "buyer").await;
    with_password(&shop, created, user::Role::User).await;
    let base = serve(shop).await;
    let client = Client::new();

    let response = client.get(format!("{base}/api/cart")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = login(&client, &base, "buyer").await;
    let response = client
        .get(format!("{base}/api/admin/orders"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_and_cancel_over_http() {
    let shop = common::shop().await;
    let created = common::customer(&shop, "buyer").await;
    let buyer = with_password(&shop, created, user::Role::User).await;
    let kettle = common::product(&shop, "Kettle", 50_000).await;
    common::coupon(&shop, "SAVE10", 40_000, 10, 3_000).await;
    let base = serve(shop).await;
    let client = Client::new();
    let token = login(&client, &base, "buyer").await;

    let response = client
        .post(format!("{base}/api/cart"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": kettle.id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{base}/api/coupons/apply"))
        .bearer_auth(&token)
        .json(&json!({ "code": "save10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cart: Value = client
        .get(format!("{base}/api/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["subtotal"], 50_000);
    assert_eq!(cart["discount"], 3_000);
    assert_eq!(cart["payable_total"], 47_000);

    let response = client
        .post(format!("{base}/api/orders"))
        .bearer_auth(&token)
        .json(&json!({ "payment_method_id": payment_method::CASH_ON_DELIVERY }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let lines: Value = response.json().await.unwrap();
    let order_id = lines[0]["id"].as_i64().unwrap();
    assert_eq!(lines[0]["user_id"], buyer.id);
    assert_eq!(lines[0]["status"], "pending");

    let response = client
        .post(format!("{base}/api/orders/{order_id}/cancel"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refund: Value = response.json().await.unwrap();
    assert_eq!(refund["order"]["status"], "cancelled");
    assert_eq!(refund["credited"], false);

    // Second cancel is a state conflict.
    let response = client
        .post(format!("{base}/api/orders/{order_id}/cancel"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("cannot be cancelled"));
}

#[tokio::test]
async fn test_error_kinds_map_to_status_codes() {
    let shop = common::shop().await;
    let created = common::customer(&shop, "buyer").await;
    with_password(&shop, created, user::Role::User).await;
    let base = serve(shop).await;
    let client = Client::new();
    let token = login(&client, &base, "buyer").await;

    let response = client
        .post(format!("{base}/api/coupons/apply"))
        .bearer_auth(&token)
        .json(&json!({ "code": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{base}/api/orders/404"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(format!("{base}/api/orders"))
        .bearer_auth(&token)
        .json(&json!({ "payment_method_id": payment_method::WALLET }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_credit_shows_in_wallet() {
    let shop = common::shop().await;
    let created = common::customer(&shop, "buyer").await;
    let buyer = with_password(&shop, created, user::Role::User).await;
    let created = common::user_without_address(&shop, "boss").await;
    with_password(&shop, created, user::Role::Admin).await;
    let base = serve(shop).await;
    let client = Client::new();
    let admin_token = login(&client, &base, "boss").await;
    let token = login(&client, &base, "buyer").await;

    let response = client
        .post(format!("{base}/api/admin/wallets/{}/credit", buyer.id))
        .bearer_auth(&admin_token)
        .json(&json!({ "amount": 2_500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let wallet: Value = client
        .get(format!("{base}/api/wallet"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(wallet["balance"], 2_500);

    let history: Value = client
        .get(format!("{base}/api/wallet/history"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["reason"], "adjustment");
    assert_eq!(history[0]["kind"], "credit");
}
