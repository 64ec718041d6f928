pub mod address;
pub mod cart;
pub mod coupon;
pub mod coupon_tracking;
pub mod order;
pub mod payment_intent;
pub mod payment_method;
pub mod product;
pub mod referral;
pub mod referral_claim;
pub mod user;
pub mod wallet;
pub mod wallet_transaction;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Schema, Set,
    TransactionTrait,
};
use tracing::info;

use crate::entities::payment_method::PaymentKind;

macro_rules! create_tables {
    ($db:expr, $schema:expr, $($entity:expr),+ $(,)?) => {
        $(
            let mut statement = $schema.create_table_from_entity($entity);
            statement.if_not_exists();
            $db.execute($db.get_database_backend().build(&statement)).await?;
        )+
    };
}

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_tables!(
        db,
        schema,
        user::Entity,
        address::Entity,
        product::Entity,
        cart::Entity,
        coupon::Entity,
        coupon_tracking::Entity,
        payment_method::Entity,
        order::Entity,
        payment_intent::Entity,
        wallet::Entity,
        wallet_transaction::Entity,
        referral::Entity,
        referral_claim::Entity,
    );

    Ok(())
}

/// Seeds the payment methods checkout refers to by id, and, when a password is
/// given, an `admin` and a `user` account. Safe to call on every start.
pub async fn primary_settup(db: &DatabaseConnection, seed_password: Option<&str>) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    if payment_method::Entity::find().count(&txn).await? == 0 {
        let methods = [
            (payment_method::CASH_ON_DELIVERY, "Cash on delivery", PaymentKind::CashOnDelivery),
            (payment_method::ONLINE, "Online payment", PaymentKind::Online),
            (payment_method::WALLET, "Wallet", PaymentKind::Wallet),
        ]
        .map(|(id, name, kind)| payment_method::ActiveModel {
            id: Set(id),
            name: Set(name.to_owned()),
            kind: Set(kind),
        });
        payment_method::Entity::insert_many(methods).exec(&txn).await?;
        info!("Seeded payment methods");
    }

    if let Some(password) = seed_password {
        if user::Entity::find().count(&txn).await? == 0 {
            let password_hash = hash_password(password).map_err(DbErr::Custom)?;

            let new_admin = user::ActiveModel {
                username: Set("admin".to_owned()),
                password: Set(password_hash.clone()),
                role: Set(user::Role::Admin),
                ..Default::default()
            };

            let new_user = user::ActiveModel {
                username: Set("user".to_owned()),
                password: Set(password_hash),
                role: Set(user::Role::User),
                ..Default::default()
            };

            user::Entity::insert_many([new_user, new_admin]).exec(&txn).await?;
            info!("Seeded admin and user accounts");
        }
    }

    txn.commit().await
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| err.to_string())
}
