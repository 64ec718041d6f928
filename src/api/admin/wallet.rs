use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::respond;
use crate::entities::wallet_transaction::TransactionReason;
use crate::services::{wallet, Shop};

pub fn admin_wallet_router() -> Router {
    Router::new().route("/wallets/:user_id/credit", post(credit_wallet))
}

async fn credit_wallet(
    Path(user_id): Path<i32>,
    Extension(shop): Extension<Arc<Shop>>,
    Json(payload): Json<CreditWallet>,
) -> Response {
    respond(
        wallet::credit(&shop, user_id, payload.amount, TransactionReason::Adjustment).await,
        StatusCode::OK,
    )
}

#[derive(Deserialize)]
struct CreditWallet {
    amount: i64,
}
