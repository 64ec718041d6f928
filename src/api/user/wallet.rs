use axum::{extract::Extension, http::StatusCode, response::Response, routing::get, Router};
use std::sync::Arc;

use crate::api::respond;
use crate::middleware::auth::Claims;
use crate::services::{wallet, Shop};

pub fn wallet_router() -> Router {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/history", get(get_history))
}

async fn get_wallet(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(wallet::get_wallet(&shop, claims.user_id).await, StatusCode::OK)
}

async fn get_history(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(wallet::get_history(&shop, claims.user_id).await, StatusCode::OK)
}
