//! Wallet ledger. The balance only moves together with an appended transaction
//! row, so `balance == sum(credits) - sum(debits)` holds for every user.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, warn};

use crate::entities::{
    user, wallet,
    wallet_transaction::{self, TransactionKind, TransactionReason},
};
use crate::services::{error::ShopError, ShopResult, Shop};

/// Returns the user's wallet, creating an empty one on first use.
pub(crate) async fn ensure_wallet<C: ConnectionTrait>(conn: &C, user_id: i32) -> ShopResult<wallet::Model> {
    let existing = wallet::Entity::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .one(conn)
        .await?;

    match existing {
        Some(wallet) => Ok(wallet),
        None => {
            let created = wallet::ActiveModel {
                user_id: Set(user_id),
                balance: Set(0),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            info!(user_id, "Initialized wallet");
            Ok(created)
        }
    }
}

fn ensure_positive(amount: i64) -> ShopResult<()> {
    if amount > 0 {
        Ok(())
    } else {
        Err(ShopError::Validation(format!("amount must be positive, got {amount}")))
    }
}

async fn append<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    amount: i64,
    kind: TransactionKind,
    reason: TransactionReason,
) -> ShopResult<()> {
    wallet_transaction::ActiveModel {
        user_id: Set(user_id),
        amount: Set(amount),
        kind: Set(kind),
        reason: Set(reason),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Credits inside the caller's transaction. The caller holds the user's lock.
pub(crate) async fn credit_on<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    amount: i64,
    reason: TransactionReason,
) -> ShopResult<wallet::Model> {
    ensure_positive(amount)?;
    let current = ensure_wallet(conn, user_id).await?;
    let balance = current
        .balance
        .checked_add(amount)
        .ok_or_else(|| ShopError::Validation("wallet balance overflow".into()))?;

    let mut wallet: wallet::ActiveModel = current.into();
    wallet.balance = Set(balance);
    let updated = wallet.update(conn).await?;
    append(conn, user_id, amount, TransactionKind::Credit, reason).await?;

    info!(user_id, amount, balance, reason = ?reason, "Credited wallet");
    Ok(updated)
}

/// Debits inside the caller's transaction. The caller holds the user's lock.
pub(crate) async fn debit_on<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    amount: i64,
    reason: TransactionReason,
) -> ShopResult<wallet::Model> {
    ensure_positive(amount)?;
    let current = ensure_wallet(conn, user_id).await?;
    if amount > current.balance {
        warn!(user_id, amount, balance = current.balance, "Rejected debit over balance");
        return Err(ShopError::InsufficientBalance {
            balance: current.balance,
            required: amount,
        });
    }

    let balance = current.balance - amount;
    let mut wallet: wallet::ActiveModel = current.into();
    wallet.balance = Set(balance);
    let updated = wallet.update(conn).await?;
    append(conn, user_id, amount, TransactionKind::Debit, reason).await?;

    info!(user_id, amount, balance, reason = ?reason, "Debited wallet");
    Ok(updated)
}

pub async fn credit(shop: &Shop, user_id: i32, amount: i64, reason: TransactionReason) -> ShopResult<wallet::Model> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;
    user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(ShopError::UserNotFound(user_id))?;
    let wallet = credit_on(&txn, user_id, amount, reason).await?;
    txn.commit().await?;
    Ok(wallet)
}

pub async fn debit(shop: &Shop, user_id: i32, amount: i64, reason: TransactionReason) -> ShopResult<wallet::Model> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;
    let wallet = debit_on(&txn, user_id, amount, reason).await?;
    txn.commit().await?;
    Ok(wallet)
}

pub async fn get_wallet(shop: &Shop, user_id: i32) -> ShopResult<wallet::Model> {
    let _guard = shop.locks.lock(user_id).await;
    let txn = shop.db.begin().await?;
    let wallet = ensure_wallet(&txn, user_id).await?;
    txn.commit().await?;
    Ok(wallet)
}

/// Newest first.
pub async fn get_history(shop: &Shop, user_id: i32) -> ShopResult<Vec<wallet_transaction::Model>> {
    Ok(wallet_transaction::Entity::find()
        .filter(wallet_transaction::Column::UserId.eq(user_id))
        .order_by_desc(wallet_transaction::Column::Id)
        .all(&shop.db)
        .await?)
}

/// `(stored balance, balance derived from the history)`; they must agree.
pub async fn reconcile(shop: &Shop, user_id: i32) -> ShopResult<(i64, i64)> {
    let balance = wallet::Entity::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .one(&shop.db)
        .await?
        .map_or(0, |wallet| wallet.balance);

    let derived = get_history(shop, user_id)
        .await?
        .iter()
        .map(|entry| match entry.kind {
            TransactionKind::Credit => entry.amount,
            TransactionKind::Debit => -entry.amount,
        })
        .sum();

    Ok((balance, derived))
}
