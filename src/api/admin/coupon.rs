use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::api::respond;
use crate::entities::coupon::CouponState;
use crate::services::{coupon::{self, CouponDraft}, Shop};

//ROUTERS
pub fn admin_coupon_router() -> Router {
    Router::new()
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/:id", put(edit_coupon))
        .route("/coupons/:id/block", post(block_coupon))
        .route("/coupons/:id/unblock", post(unblock_coupon))
}

async fn list_coupons(Extension(shop): Extension<Arc<Shop>>) -> Response {
    respond(coupon::list_coupons(&shop).await, StatusCode::OK)
}

async fn create_coupon(
    Extension(shop): Extension<Arc<Shop>>,
    Json(payload): Json<CouponDraft>,
) -> Response {
    respond(coupon::create_coupon(&shop, payload).await, StatusCode::CREATED)
}

async fn edit_coupon(
    Path(id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Json(payload): Json<CouponDraft>,
) -> Response {
    respond(coupon::edit_coupon(&shop, id, payload).await, StatusCode::OK)
}

async fn block_coupon(Path(id): Path<i32>, Extension(shop): Extension<Arc<Shop>>) -> Response {
    respond(
        coupon::set_coupon_state(&shop, id, CouponState::Blocked).await,
        StatusCode::OK,
    )
}

async fn unblock_coupon(Path(id): Path<i32>, Extension(shop): Extension<Arc<Shop>>) -> Response {
    respond(
        coupon::set_coupon_state(&shop, id, CouponState::Active).await,
        StatusCode::OK,
    )
}
