//! Error types for the Repohaus crate
//!
//! This module contains all error types that can be returned by Repohaus
//! coordinator operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepohausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Repository already registered: {0}")]
    RepositoryAlreadyRegistered(String),

    #[error("Data access error: {0}")]
    DataAccess(#[from] repo_core::RepoError),
}
