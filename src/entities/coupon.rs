use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "coupon")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    /// The subtotal has to be strictly above this before any discount applies.
    pub min_order_value: i64,
    pub discount_percent: i32,
    pub discount_max_amount: i64,
    pub valid_from: DateTimeUtc,
    pub valid_till: DateTimeUtc,
    pub state: CouponState,
}

impl Model {
    /// Active and `now` within `[valid_from, valid_till]`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.state == CouponState::Active && self.valid_from <= now && now <= self.valid_till
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    enum_name = "coupon_state_enum",
    db_type = "String(StringLen::N(16))",
    rs_type = "String"
)]
#[serde(rename_all = "snake_case")]
pub enum CouponState {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "blocked")]
    Blocked,
}
