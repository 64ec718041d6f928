pub mod auth;

use axum::Router;
use std::sync::Arc;

use auth::auth_router;

pub fn public_api_router(secret: Arc<str>) -> Router {
    Router::new().merge(auth_router(secret))
}
