mod common;

use storefront::entities::wallet_transaction::TransactionReason;
use storefront::services::{referral, wallet, ErrorKind};
use storefront::ShopError;

#[tokio::test]
async fn test_claim_credits_both_users() {
    let shop = common::shop().await;
    let owner = common::customer(&shop, "owner").await;
    let newcomer = common::customer(&shop, "newcomer").await;

    let code = referral::ensure_referral_code(&shop, owner.id).await.unwrap().code;
    let bonus = referral::claim_referral_bonus(&shop, &code.to_lowercase(), newcomer.id)
        .await
        .unwrap();

    assert_eq!(bonus.owner_id, owner.id);
    assert_eq!(bonus.claimant_id, newcomer.id);
    assert_eq!(bonus.bonus, 5_000);

    for user_id in [owner.id, newcomer.id] {
        assert_eq!(wallet::get_wallet(&shop, user_id).await.unwrap().balance, 5_000);
        let history = wallet::get_history(&shop, user_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, TransactionReason::ReferralBonus);
    }
}

#[tokio::test]
async fn test_code_is_stable_per_user() {
    let shop = common::shop().await;
    let owner = common::customer(&shop, "owner").await;
    let other = common::customer(&shop, "other").await;

    let first = referral::ensure_referral_code(&shop, owner.id).await.unwrap();
    let second = referral::ensure_referral_code(&shop, owner.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.code.len(), 8);

    let theirs = referral::ensure_referral_code(&shop, other.id).await.unwrap();
    assert_ne!(theirs.code, first.code);
}

#[tokio::test]
async fn test_own_code_is_rejected() {
    let shop = common::shop().await;
    let owner = common::customer(&shop, "owner").await;
    let code = referral::ensure_referral_code(&shop, owner.id).await.unwrap().code;

    let err = referral::claim_referral_bonus(&shop, &code, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::SelfReferral));
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(wallet::get_wallet(&shop, owner.id).await.unwrap().balance, 0);
}

#[tokio::test]
async fn test_unknown_code() {
    let shop = common::shop().await;
    let newcomer = common::customer(&shop, "newcomer").await;

    let err = referral::claim_referral_bonus(&shop, "NOSUCHCD", newcomer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::CodeNotFound(code) if code == "NOSUCHCD"));
}

#[tokio::test]
async fn test_bonus_is_claimed_once() {
    let shop = common::shop().await;
    let first_owner = common::customer(&shop, "first").await;
    let second_owner = common::customer(&shop, "second").await;
    let newcomer = common::customer(&shop, "newcomer").await;

    let first = referral::ensure_referral_code(&shop, first_owner.id).await.unwrap().code;
    let second = referral::ensure_referral_code(&shop, second_owner.id).await.unwrap().code;

    referral::claim_referral_bonus(&shop, &first, newcomer.id)
        .await
        .unwrap();
    for code in [&first, &second] {
        let err = referral::claim_referral_bonus(&shop, code, newcomer.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ReferralAlreadyClaimed));
    }

    assert_eq!(wallet::get_wallet(&shop, newcomer.id).await.unwrap().balance, 5_000);
    assert_eq!(wallet::get_wallet(&shop, second_owner.id).await.unwrap().balance, 0);
    assert_eq!(wallet::reconcile(&shop, newcomer.id).await.unwrap(), (5_000, 5_000));
}
