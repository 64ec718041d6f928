pub mod cart;
pub mod coupon;
pub mod order;
pub mod payment;
pub mod referral;
pub mod wallet;

use axum::{middleware::from_fn_with_state, Router};

use crate::middleware::auth::{auth_middleware, AuthState};

pub fn user_api_router(auth: AuthState) -> Router {
    Router::new()
        .merge(cart::cart_router())
        .merge(coupon::coupon_router())
        .merge(order::order_router())
        .merge(payment::payment_router())
        .merge(wallet::wallet_router())
        .merge(referral::referral_router())
        .layer(from_fn_with_state(auth, auth_middleware))
}
