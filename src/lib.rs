pub mod api;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod events;
pub mod models;
pub mod services;

pub use api::middleware::{ApiError, ApiResult};
pub use config::*;
pub use database::Database;
pub use events::*;
pub use models::*;
pub use services::*;
