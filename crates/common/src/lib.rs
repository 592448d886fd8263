//! Agora Common Library
//!
//! Shared code for the Agora paper-review service:
//! - Visibility and transition authority (pure policy)
//! - Database models and repository
//! - Error types and handling
//! - Configuration management
//! - Authentication and identity
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod policy;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
