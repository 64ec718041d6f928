use std::{env, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

/// Upper bounds accepted from the environment.
pub const MAX_RETURN_WINDOW_DAYS: i64 = 3_650;
pub const MAX_REFERRAL_BONUS: i64 = 100_000_000;

/// Knobs the core consults while running.
#[derive(Clone, Debug)]
pub struct Policy {
    pub return_window_days: i64,
    /// Credited to both sides of a referral, in minor units.
    pub referral_bonus: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            return_window_days: 7,
            referral_bonus: 5_000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub secret: String,
    pub bind_addr: String,
    pub seed_password: Option<String>,
    pub policy: Policy,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Policy::default();
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            secret: required("SECRET")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned()),
            seed_password: env::var("SEED_PASSWORD").ok(),
            policy: Policy {
                return_window_days: parsed(
                    "RETURN_WINDOW_DAYS",
                    defaults.return_window_days,
                    MAX_RETURN_WINDOW_DAYS,
                )?,
                referral_bonus: parsed("REFERRAL_BONUS", defaults.referral_bonus, MAX_REFERRAL_BONUS)?,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr + PartialOrd + Default>(name: &'static str, default: T, max: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => bounded(name, value, max),
        Err(_) => Ok(default),
    }
}

/// Parses `value`, accepting only `0..=max`.
fn bounded<T: FromStr + PartialOrd + Default>(name: &'static str, value: String, max: T) -> Result<T, ConfigError> {
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed >= T::default() && parsed <= max => Ok(parsed),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}
