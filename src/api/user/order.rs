use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::respond;
use crate::middleware::auth::Claims;
use crate::services::{order, refund, Shop};

pub fn order_router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(confirm_order))
        .route("/orders/wallet-check", post(wallet_check))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/return", post(return_order))
}

async fn list_orders(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(order::list_orders(&shop, claims.user_id).await, StatusCode::OK)
}

async fn get_order(
    Path(id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(order::get_order(&shop, claims.user_id, id).await, StatusCode::OK)
}

async fn wallet_check(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(
        order::validate_wallet_payment(&shop, claims.user_id).await,
        StatusCode::OK,
    )
}

async fn confirm_order(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ConfirmOrder>,
) -> Response {
    respond(
        order::confirm_order(&shop, claims.user_id, payload.payment_method_id).await,
        StatusCode::CREATED,
    )
}

async fn cancel_order(
    Path(id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(refund::cancel_order(&shop, claims.user_id, id).await, StatusCode::OK)
}

async fn return_order(
    Path(id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(refund::return_order(&shop, claims.user_id, id).await, StatusCode::OK)
}

#[derive(Deserialize)]
struct ConfirmOrder {
    payment_method_id: i32,
}
