pub mod coupon;
pub mod order;
pub mod wallet;

use axum::{middleware::from_fn_with_state, Router};

use coupon::admin_coupon_router;
use order::admin_order_router;
use wallet::admin_wallet_router;

use crate::middleware::auth::{auth_middleware, AuthState};

pub fn admin_api_router(auth: AuthState) -> Router {
    Router::new()
        .merge(admin_coupon_router())
        .merge(admin_order_router())
        .merge(admin_wallet_router())
        .layer(from_fn_with_state(auth, auth_middleware))
}
