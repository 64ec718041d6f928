use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{message, respond, shop_error};
use crate::middleware::{auth::Claims, logging::to_response};
use crate::services::{cart, pricing, Shop};

//ROUTERS
pub fn cart_router() -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_product))
        .route("/cart/:id", patch(patch_entry).delete(remove_product))
}

/// The cart, priced fresh on every view.
async fn get_cart(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(pricing::price_cart(&shop, claims.user_id).await, StatusCode::OK)
}

async fn add_product(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddProduct>,
) -> Response {
    respond(
        cart::add_product(&shop, claims.user_id, payload.product_id, payload.quantity).await,
        StatusCode::CREATED,
    )
}

async fn remove_product(
    Path(id): Path<i32>,
    Extension(claims): Extension<Claims>,
    Extension(shop): Extension<Arc<Shop>>,
) -> Response {
    message(
        cart::remove_product(&shop, claims.user_id, id).await,
        "Resource deleted successfully",
    )
}

async fn patch_entry(
    Path(id): Path<i32>,
    Extension(claims): Extension<Claims>,
    Extension(shop): Extension<Arc<Shop>>,
    Json(payload): Json<PatchCart>,
) -> Response {
    match cart::set_quantity(&shop, claims.user_id, id, payload.quantity).await {
        Ok(Some(entry)) => to_response((StatusCode::OK, Json(entry)), Ok(())),
        Ok(None) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully"
                })),
            ),
            Ok(()),
        ),
        Err(err) => shop_error(err),
    }
}

//Structs
#[derive(Deserialize, Debug)]
struct AddProduct {
    product_id: i32,
    quantity: i32,
}

#[derive(Deserialize)]
struct PatchCart {
    quantity: i32,
}
