use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "payment_method")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub kind: PaymentKind,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(
    enum_name = "payment_kind_enum",
    db_type = "String(StringLen::N(32))",
    rs_type = "String"
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    #[sea_orm(string_value = "cash_on_delivery")]
    CashOnDelivery,
    #[sea_orm(string_value = "online")]
    Online,
    #[sea_orm(string_value = "wallet")]
    Wallet,
}

impl PaymentKind {
    /// Whether money was captured up front and so has to go back to the wallet on reversal.
    pub fn is_refundable(self) -> bool {
        matches!(self, Self::Online | Self::Wallet)
    }
}

pub const CASH_ON_DELIVERY: i32 = 1;
pub const ONLINE: i32 = 2;
pub const WALLET: i32 = 3;
