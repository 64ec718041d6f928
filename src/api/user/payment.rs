use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::respond;
use crate::middleware::auth::Claims;
use crate::services::{payment, Shop};

pub fn payment_router() -> Router {
    Router::new()
        .route("/payments/intent", post(create_intent))
        .route("/payments/verify", post(verify_payment))
}

async fn create_intent(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(payment::create_intent(&shop, claims.user_id).await, StatusCode::CREATED)
}

async fn verify_payment(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<VerifyPayment>,
) -> Response {
    respond(
        payment::verify_payment(
            &shop,
            claims.user_id,
            &payload.order_id,
            &payload.payment_id,
            &payload.signature,
        )
        .await,
        StatusCode::OK,
    )
}

#[derive(Deserialize)]
struct VerifyPayment {
    order_id: String,
    payment_id: String,
    signature: String,
}
