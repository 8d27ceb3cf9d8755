//! Convenience re-exports for common Repohaus usage
//!
//! This prelude module re-exports the most commonly used items from the
//! Repohaus ecosystem, making it easier to import everything you need with a
//! single use statement.
//!
//! # Example
//!
//! ```rust
//! use repohaus::prelude::*;
//!
//! // Now you have access to all the common Repohaus types and traits
//! ```

// Core Repohaus components
pub use crate::core::Repohaus;
pub use crate::errors::RepohausError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig};

// Re-export commonly used repo-core types for convenience
pub use repo_core::prelude::*;

// Re-export repo_core and entity_mapping modules for macro-generated code
pub use entity_mapping;
pub use repo_core;

// Entity derive for model creation
pub use entity_derive::Entity;

// Common external dependencies
pub use anyhow;
pub use sqlx;
pub use tokio;
pub use uuid::Uuid;

// Commonly used sqlx types
pub use sqlx::{PgPool, Postgres, Transaction};
