//! # Repohaus
//!
//! A generic Rust data-access core for PostgreSQL: uniform repositories over
//! any entity type, raw command execution with result materialization, and
//! cross-repository atomic transactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repohaus::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq, Entity)]
//! #[entity(table = "users")]
//! pub struct User {
//!     #[key]
//!     pub id: Uuid,
//!
//!     pub name: String,
//!
//!     #[column(name = "mail_address")]
//!     pub email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "repohaus".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let mut repohaus = Repohaus::new(config).await?;
//!
//!     let users = Repository::<User>::new(repohaus.session_factory());
//!     repohaus.register_repository("users".to_string(), users)?;
//!     let users = repohaus.repository::<User>("users")?;
//!
//!     let user = User {
//!         id: Uuid::new_v4(),
//!         name: "John Doe".to_string(),
//!         email: "john@example.com".to_string(),
//!     };
//!
//!     users.insert(vec![user.clone()]).await?;
//!     let found = users
//!         .select_one(QuerySpec::new().filter(QueryFilter::eq("id", serde_json::json!(user.id))))
//!         .await?;
//!     println!("Stored user: {:?}", found);
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::Repohaus;
pub use crate::errors::RepohausError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use entity_derive;
pub use entity_mapping;
pub use repo_core;

// Re-export external dependencies used in public API
pub use sqlx;
