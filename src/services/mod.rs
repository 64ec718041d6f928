//! Transaction core: pricing, coupons, checkout, refunds, wallet and referrals.
//!
//! Every function that mutates more than one row takes the affected users'
//! locks from [`UserLocks`] and runs inside a single database transaction, so
//! it either commits all of its effects or none.

pub mod cart;
pub mod coupon;
pub mod error;
pub mod locks;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod referral;
pub mod refund;
pub mod wallet;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Policy;
pub use error::{ErrorKind, ShopError, ShopResult};
pub use locks::UserLocks;
pub use payment::{PaymentGateway, SandboxGateway};

/// Everything the core needs to serve a call.
#[derive(Clone)]
pub struct Shop {
    pub db: DatabaseConnection,
    pub locks: UserLocks,
    pub gateway: Arc<dyn PaymentGateway>,
    pub policy: Policy,
}

impl Shop {
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn PaymentGateway>, policy: Policy) -> Self {
        Self {
            db,
            locks: UserLocks::new(),
            gateway,
            policy,
        }
    }
}
