pub mod api;
pub mod config;
pub mod entities;
pub mod middleware;
pub mod services;

pub use api::create_api_router;
pub use config::{Config, Policy};
pub use services::{Shop, ShopError};
