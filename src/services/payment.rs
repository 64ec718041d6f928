//! Online payment port. The gateway itself lives outside this crate; checkout
//! only needs an order intent and a verified signature for it.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::payment_intent::{self, IntentStatus};
use crate::services::{error::ShopError, pricing::price_cart_on, ShopResult, Shop};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
}

pub trait PaymentGateway: Send + Sync {
    fn create_order_intent(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, GatewayError>;

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<bool, GatewayError>;
}

/// Offline gateway for development and tests.
#[derive(Clone, Debug, Default)]
pub struct SandboxGateway;

impl SandboxGateway {
    /// The signature a client would receive from the sandbox checkout widget.
    pub fn sign(order_id: &str, payment_id: &str) -> String {
        format!("sandbox:{order_id}|{payment_id}")
    }
}

impl PaymentGateway for SandboxGateway {
    fn create_order_intent(&self, amount: i64, _receipt: &str) -> Result<GatewayOrder, GatewayError> {
        if amount <= 0 {
            return Err(GatewayError::Rejected(format!("amount must be positive, got {amount}")));
        }
        Ok(GatewayOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount,
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<bool, GatewayError> {
        Ok(signature == Self::sign(order_id, payment_id))
    }
}

/// Opens a gateway order for the user's current payable total.
pub async fn create_intent(shop: &Shop, user_id: i32) -> ShopResult<payment_intent::Model> {
    let _guard = shop.locks.lock(user_id).await;

    let priced = price_cart_on(&shop.db, user_id, Utc::now()).await?;
    if priced.lines.is_empty() || priced.payable_total <= 0 {
        return Err(ShopError::EmptyCart);
    }

    let receipt = Uuid::new_v4().to_string();
    let order = shop
        .gateway
        .create_order_intent(priced.payable_total, &receipt)
        .map_err(|err| {
            error!(user_id, error = %err, "Gateway failed to create order intent");
            err
        })?;

    let intent = payment_intent::ActiveModel {
        user_id: Set(user_id),
        gateway_order_id: Set(order.id),
        gateway_payment_id: Set(None),
        amount: Set(order.amount),
        status: Set(IntentStatus::Created),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&shop.db)
    .await?;

    info!(user_id, intent_id = intent.id, amount = intent.amount, "Created payment intent");
    Ok(intent)
}

/// Checks the gateway signature. Only the intent row changes, and only on success.
pub async fn verify_payment(
    shop: &Shop,
    user_id: i32,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> ShopResult<payment_intent::Model> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    let intent = payment_intent::Entity::find()
        .filter(payment_intent::Column::GatewayOrderId.eq(gateway_order_id))
        .filter(payment_intent::Column::UserId.eq(user_id))
        .filter(payment_intent::Column::Status.eq(IntentStatus::Created))
        .one(&txn)
        .await?
        .ok_or_else(|| ShopError::PaymentIntentNotFound(gateway_order_id.to_owned()))?;

    let valid = shop
        .gateway
        .verify_signature(gateway_order_id, gateway_payment_id, signature)
        .map_err(|err| {
            error!(user_id, gateway_order_id, error = %err, "Gateway failed to verify payment");
            err
        })?;
    if !valid {
        warn!(user_id, gateway_order_id, "Payment signature mismatch");
        return Err(ShopError::PaymentVerificationFailed);
    }

    let mut intent: payment_intent::ActiveModel = intent.into();
    intent.gateway_payment_id = Set(Some(gateway_payment_id.to_owned()));
    intent.status = Set(IntentStatus::Verified);
    let verified = intent.update(&txn).await?;

    txn.commit().await?;
    info!(user_id, intent_id = verified.id, "Verified online payment");
    Ok(verified)
}

/// Consumes the newest verified intent matching `amount`, inside checkout's transaction.
pub(crate) async fn consume_verified<C: ConnectionTrait>(conn: &C, user_id: i32, amount: i64) -> ShopResult<()> {
    let intent = payment_intent::Entity::find()
        .filter(payment_intent::Column::UserId.eq(user_id))
        .filter(payment_intent::Column::Status.eq(IntentStatus::Verified))
        .filter(payment_intent::Column::Amount.eq(amount))
        .order_by_desc(payment_intent::Column::Id)
        .one(conn)
        .await?
        .ok_or(ShopError::PaymentNotVerified)?;

    let mut intent: payment_intent::ActiveModel = intent.into();
    intent.status = Set(IntentStatus::Consumed);
    intent.update(conn).await?;
    Ok(())
}
