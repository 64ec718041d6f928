use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::respond;
use crate::entities::order::Status;
use crate::services::{order, refund, Shop};

pub fn admin_order_router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", patch(update_status))
        .route("/orders/:id/cancel", post(cancel_order))
}

async fn list_orders(Extension(shop): Extension<Arc<Shop>>) -> Response {
    respond(order::list_all_orders(&shop).await, StatusCode::OK)
}

async fn update_status(
    Path(id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Json(payload): Json<PatchStatus>,
) -> Response {
    respond(
        order::update_order_status(&shop, id, payload.status).await,
        StatusCode::OK,
    )
}

async fn cancel_order(Path(id): Path<i32>, Extension(shop): Extension<Arc<Shop>>) -> Response {
    respond(refund::admin_cancel_order(&shop, id).await, StatusCode::OK)
}

#[derive(Deserialize)]
struct PatchStatus {
    status: Status,
}
