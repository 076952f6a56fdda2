//! Infrastructure layer: stores, post lifecycle orchestration, accounts, config.

pub mod account_service;
pub mod config;
pub mod lifecycle;
pub mod store;

pub use account_service::{AccountError, AccountService};
pub use config::{AppConfig, ConfigError};
pub use lifecycle::{LifecycleError, PostLifecycle, PostSubmission, aggregate_rows};
