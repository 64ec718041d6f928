pub mod admin;
pub mod public;
pub mod user;

use axum::{http::StatusCode, middleware::from_fn, response::Response, Extension, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::AuthState,
    logging::{logging_middleware, to_response, ApiError},
};
use crate::entities::user::Role;
use crate::services::{ErrorKind, Shop, ShopError, ShopResult};

use admin::admin_api_router;
use public::public_api_router;
use user::user_api_router;

pub fn create_api_router(shop: Arc<Shop>, secret: Arc<str>) -> Router {
    let auth = |role| AuthState {
        db: shop.db.clone(),
        secret: secret.clone(),
        role,
    };

    Router::new()
        .merge(public_api_router(secret.clone()))
        .nest("/api", user_api_router(auth(Role::User)))
        .nest("/api/admin", admin_api_router(auth(Role::Admin)))
        .layer(Extension(shop))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Maps a core error onto a status code. External failures keep their detail
/// in the log and give the client a generic message.
pub fn shop_error(err: ShopError) -> Response {
    let kind = err.kind();
    let (status, message) = match (kind, &err) {
        (ErrorKind::Validation, _) => (StatusCode::BAD_REQUEST, err.to_string()),
        (ErrorKind::NotFound, _) => (StatusCode::NOT_FOUND, err.to_string()),
        (ErrorKind::State, _) => (StatusCode::CONFLICT, err.to_string()),
        (ErrorKind::Expired, _) => (StatusCode::GONE, err.to_string()),
        (ErrorKind::External, ShopError::Gateway(_)) => {
            (StatusCode::BAD_GATEWAY, "Payment provider error".to_owned())
        }
        (ErrorKind::External, _) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned()),
    };

    to_response(
        (status, Json(json!({ "error": message }))),
        Err(ApiError::Shop {
            kind,
            message: err.to_string(),
        }),
    )
}

pub fn respond<T: Serialize>(result: ShopResult<T>, status: StatusCode) -> Response {
    match result {
        Ok(body) => to_response((status, Json(body)), Ok(())),
        Err(err) => shop_error(err),
    }
}

pub fn message(result: ShopResult<()>, text: &str) -> Response {
    match result {
        Ok(()) => to_response((StatusCode::OK, Json(json!({ "message": text }))), Ok(())),
        Err(err) => shop_error(err),
    }
}
