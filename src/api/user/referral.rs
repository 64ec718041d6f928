use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::respond;
use crate::middleware::auth::Claims;
use crate::services::{referral, Shop};

pub fn referral_router() -> Router {
    Router::new()
        .route("/referral", get(get_code))
        .route("/referral/claim", post(claim))
}

async fn get_code(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    respond(
        referral::ensure_referral_code(&shop, claims.user_id).await,
        StatusCode::OK,
    )
}

async fn claim(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ClaimReferral>,
) -> Response {
    respond(
        referral::claim_referral_bonus(&shop, &payload.code, claims.user_id).await,
        StatusCode::OK,
    )
}

#[derive(Deserialize)]
struct ClaimReferral {
    code: String,
}
