//! Core Repohaus functionality
//!
//! This module contains the main Repohaus struct and its implementation,
//! providing centralized coordination for the connection pool, repository
//! registry, and transaction coordination.

use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::RepohausError;
use config::DatabaseConfig;
use entity_mapping::Entity;
use repo_core::{Repository, SessionFactory, TransactionCoordinator};

/// Main Repohaus coordinator that manages the database connection and
/// registered repositories
pub struct Repohaus {
    pool: PgPool,
    repositories: HashMap<String, Box<dyn std::any::Any + Send + Sync>>,
}

impl Repohaus {
    /// Create new Repohaus with database connection
    pub async fn new(config: DatabaseConfig) -> Result<Self, RepohausError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;

        Ok(Self {
            pool,
            repositories: HashMap::new(),
        })
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Session factory over this coordinator's pool
    pub fn session_factory(&self) -> SessionFactory {
        SessionFactory::new(self.pool.clone())
    }

    /// Transaction coordinator over this coordinator's pool
    pub fn coordinator(&self) -> TransactionCoordinator {
        TransactionCoordinator::new(self.session_factory())
    }

    /// Register a repository under a given name
    pub fn register_repository<E>(
        &mut self,
        name: String,
        repository: Repository<E>,
    ) -> Result<(), RepohausError>
    where
        E: Entity,
    {
        if self.repositories.contains_key(&name) {
            return Err(RepohausError::RepositoryAlreadyRegistered(name));
        }

        self.repositories.insert(name, Box::new(repository));
        Ok(())
    }

    /// Get a registered repository by name
    pub fn repository<E>(&self, name: &str) -> Result<&Repository<E>, RepohausError>
    where
        E: Entity,
    {
        self.repositories
            .get(name)
            .and_then(|repository| repository.downcast_ref::<Repository<E>>())
            .ok_or_else(|| RepohausError::RepositoryNotFound(name.to_string()))
    }

    /// List all registered repository names
    pub fn list_repositories(&self) -> Vec<&String> {
        self.repositories.keys().collect()
    }

    /// Remove a repository by name
    pub fn unregister_repository(&mut self, name: &str) -> Result<(), RepohausError> {
        self.repositories
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepohausError::RepositoryNotFound(name.to_string()))
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), RepohausError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
