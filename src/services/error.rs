use sea_orm::DbErr;
use thiserror::Error;

use crate::entities::order::Status;
use crate::services::payment::GatewayError;

/// Coarse classes callers branch on; the HTTP layer maps them to status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    State,
    Expired,
    External,
}

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),
    #[error("coupon `{0}` is not valid")]
    InvalidCoupon(String),

    #[error("coupon {0} not found")]
    CouponNotFound(i32),
    #[error("product {0} not found")]
    ProductNotFound(i32),
    #[error("cart entry {0} not found")]
    CartEntryNotFound(i32),
    #[error("order {0} not found")]
    OrderNotFound(i32),
    #[error("payment method {0} not found")]
    PaymentMethodNotFound(i32),
    #[error("payment intent `{0}` not found")]
    PaymentIntentNotFound(String),
    #[error("referral code `{0}` not found")]
    CodeNotFound(String),
    #[error("user {0} not found")]
    UserNotFound(i32),

    #[error("product {0} is not available")]
    ProductUnavailable(i32),
    #[error("coupon `{0}` was already used")]
    CouponAlreadyUsed(String),
    #[error("coupon {0} is not applied")]
    CouponNotApplied(i32),
    #[error("no default delivery address")]
    NoAddress,
    #[error("cart is empty")]
    EmptyCart,
    #[error("insufficient wallet balance: {balance} available, {required} required")]
    InsufficientBalance { balance: i64, required: i64 },
    #[error("order {id} cannot be cancelled while {status}")]
    OrderNotCancellable { id: i32, status: Status },
    #[error("order {id} cannot be returned while {status}")]
    OrderNotReturnable { id: i32, status: Status },
    #[error("order {id} is {status} and can no longer change status")]
    OrderNotUpdatable { id: i32, status: Status },
    #[error("online payment has not been verified for this cart")]
    PaymentNotVerified,
    #[error("payment signature verification failed")]
    PaymentVerificationFailed,
    #[error("cannot redeem your own referral code")]
    SelfReferral,
    #[error("referral bonus was already claimed")]
    ReferralAlreadyClaimed,

    #[error("coupon `{0}` has expired")]
    CouponExpired(String),
    #[error("return window for order {0} has expired")]
    ReturnWindowExpired(i32),

    #[error("storage failure: {0}")]
    Storage(#[from] DbErr),
    #[error("payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidCoupon(_) => ErrorKind::Validation,
            Self::CouponNotFound(_)
            | Self::ProductNotFound(_)
            | Self::CartEntryNotFound(_)
            | Self::OrderNotFound(_)
            | Self::PaymentMethodNotFound(_)
            | Self::PaymentIntentNotFound(_)
            | Self::CodeNotFound(_)
            | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::ProductUnavailable(_)
            | Self::CouponAlreadyUsed(_)
            | Self::CouponNotApplied(_)
            | Self::NoAddress
            | Self::EmptyCart
            | Self::InsufficientBalance { .. }
            | Self::OrderNotCancellable { .. }
            | Self::OrderNotReturnable { .. }
            | Self::OrderNotUpdatable { .. }
            | Self::PaymentNotVerified
            | Self::PaymentVerificationFailed
            | Self::SelfReferral
            | Self::ReferralAlreadyClaimed => ErrorKind::State,
            Self::CouponExpired(_) | Self::ReturnWindowExpired(_) => ErrorKind::Expired,
            Self::Storage(_) | Self::Gateway(_) => ErrorKind::External,
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type ShopResult<T> = Result<T, ShopError>;
