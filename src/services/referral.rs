use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::entities::{referral, referral_claim, wallet_transaction::TransactionReason};
use crate::services::{error::ShopError, wallet, ShopResult, Shop};

const CODE_LEN: usize = 8;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReferralBonus {
    pub owner_id: i32,
    pub claimant_id: i32,
    pub bonus: i64,
}

fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect()
}

/// The user's referral code, created on first request.
pub async fn ensure_referral_code(shop: &Shop, user_id: i32) -> ShopResult<referral::Model> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;

    if let Some(existing) = referral::Entity::find()
        .filter(referral::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
    {
        return Ok(existing);
    }

    let mut code = generate_code();
    while referral::Entity::find()
        .filter(referral::Column::Code.eq(code.as_str()))
        .one(&txn)
        .await?
        .is_some()
    {
        code = generate_code();
    }

    let created = referral::ActiveModel {
        user_id: Set(user_id),
        code: Set(code),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id, "Generated referral code");
    Ok(created)
}

/// Resolves `code` to the owning user, refusing a user's own code.
pub async fn verify_referral_code<C: ConnectionTrait>(conn: &C, code: &str, claimant_id: i32) -> ShopResult<i32> {
    let code = code.trim().to_uppercase();
    let owner = referral::Entity::find()
        .filter(referral::Column::Code.eq(code.as_str()))
        .one(conn)
        .await?
        .ok_or(ShopError::CodeNotFound(code))?;

    if owner.user_id == claimant_id {
        return Err(ShopError::SelfReferral);
    }
    Ok(owner.user_id)
}

/// Credits the bonus to both wallets inside the caller's transaction.
pub(crate) async fn claim_bonus_on<C: ConnectionTrait>(
    conn: &C,
    claimant_id: i32,
    owner_id: i32,
    bonus: i64,
) -> ShopResult<()> {
    if bonus <= 0 {
        return Ok(());
    }
    wallet::credit_on(conn, claimant_id, bonus, TransactionReason::ReferralBonus).await?;
    wallet::credit_on(conn, owner_id, bonus, TransactionReason::ReferralBonus).await?;
    Ok(())
}

/// Redeems `code` for `claimant_id`. A user can claim one referral bonus, ever.
pub async fn claim_referral_bonus(shop: &Shop, code: &str, claimant_id: i32) -> ShopResult<ReferralBonus> {
    let owner_id = verify_referral_code(&shop.db, code, claimant_id).await?;

    let _guards = shop.locks.lock_many(&[claimant_id, owner_id]).await;
    let txn = shop.db.begin().await?;

    // Re-resolve under the locks; codes are immutable but this keeps the read inside the transaction.
    let owner_id = verify_referral_code(&txn, code, claimant_id).await?;

    let already_claimed = referral_claim::Entity::find()
        .filter(referral_claim::Column::ClaimantId.eq(claimant_id))
        .one(&txn)
        .await?
        .is_some();
    if already_claimed {
        warn!(claimant_id, "Rejected repeated referral claim");
        return Err(ShopError::ReferralAlreadyClaimed);
    }

    referral_claim::ActiveModel {
        claimant_id: Set(claimant_id),
        owner_id: Set(owner_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let bonus = shop.policy.referral_bonus;
    claim_bonus_on(&txn, claimant_id, owner_id, bonus).await?;

    txn.commit().await?;
    info!(claimant_id, owner_id, bonus, "Paid referral bonus");
    Ok(ReferralBonus {
        owner_id,
        claimant_id,
        bonus,
    })
}
