use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::{message, respond, shop_error};
use crate::middleware::auth::Claims;
use crate::services::{coupon, Shop, ShopError};

pub fn coupon_router() -> Router {
    Router::new()
        .route("/coupons", get(list_available))
        .route("/coupons/apply", post(apply_coupon))
        .route("/coupons/:id", delete(remove_coupon))
}

async fn list_available(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(coupon::list_available(&shop, claims.user_id).await, StatusCode::OK)
}

async fn apply_coupon(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ApplyCoupon>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return shop_error(ShopError::from(errors));
    }
    respond(
        coupon::apply_coupon(&shop, &payload.code, claims.user_id).await,
        StatusCode::OK,
    )
}

async fn remove_coupon(
    Path(id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    message(
        coupon::remove_coupon(&shop, id, claims.user_id).await,
        "Coupon removed",
    )
}

#[derive(Deserialize, Validate)]
struct ApplyCoupon {
    #[validate(length(min = 1, max = 32))]
    code: String,
}
