//! Session lifecycle and change-intent staging
//!
//! A session is a one-shot handle used for exactly one repository
//! operation: a private pooled connection when the repository is detached,
//! or a lock on the coordinator's shared transaction when it is attached.
//! The transaction context is an explicit argument at the session-opening
//! call, so the attached/detached distinction is visible where the session
//! is created. Drop semantics release the connection (or the lock) on
//! every exit path.

use crate::errors::RepoError;
use crate::query::compose::quote_identifier;
use crate::transaction::TransactionHandle;
use config::DatabaseConfig;
use entity_mapping::{ColumnMapper, Entity};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// The marked disposition of an entity prior to save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeIntent {
    Added,
    Modified,
    Removed,
}

/// Creates sessions over a shared connection pool
#[derive(Clone)]
pub struct SessionFactory {
    pool: PgPool,
}

impl SessionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a dedicated pool from explicit configuration
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, RepoError> {
        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&config.connection_string()).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a session for one operation.
    ///
    /// With a transaction context the session joins the shared transaction
    /// (holding its lock until the session drops); without one it acquires
    /// a private pooled connection.
    pub async fn session<E: Entity>(
        &self,
        context: Option<&TransactionHandle>,
    ) -> Result<Session<E>, RepoError> {
        let conn = match context {
            Some(handle) => SessionConn::Shared(handle.lock_owned().await),
            None => SessionConn::Owned(self.pool.acquire().await?),
        };

        Ok(Session {
            conn,
            staged: Vec::new(),
        })
    }
}

enum SessionConn {
    Owned(PoolConnection<Postgres>),
    Shared(OwnedMutexGuard<sqlx::Transaction<'static, Postgres>>),
}

enum Staged<E: Entity> {
    Intent(E, ChangeIntent),
    Fields(E, Vec<String>),
}

/// One-shot session handle for a single repository operation
pub struct Session<E: Entity> {
    conn: SessionConn,
    staged: Vec<Staged<E>>,
}

impl<E: Entity> Session<E> {
    /// Whether this session runs inside a coordinated transaction
    pub fn in_transaction(&self) -> bool {
        matches!(self.conn, SessionConn::Shared(_))
    }

    /// Raw connection access for command execution
    pub fn connection(&mut self) -> &mut PgConnection {
        match &mut self.conn {
            SessionConn::Owned(conn) => &mut **conn,
            SessionConn::Shared(guard) => &mut ***guard,
        }
    }

    /// Stage a whole-entity change intent
    pub fn mark(&mut self, entity: E, intent: ChangeIntent) {
        self.staged.push(Staged::Intent(entity, intent));
    }

    /// Stage a partial update of the named properties only
    pub fn mark_fields(&mut self, entity: E, properties: Vec<String>) {
        self.staged.push(Staged::Fields(entity, properties));
    }

    /// Execute every staged change as one unit.
    ///
    /// A pooled session wraps the statements in its own transaction; a
    /// shared session executes directly on the coordinated transaction,
    /// whose commit belongs to the coordinator. Returns affected rows.
    pub async fn save_changes(&mut self) -> Result<u64, RepoError> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            table = E::table_name(),
            changes = staged.len(),
            shared = self.in_transaction(),
            "saving staged changes"
        );

        match &mut self.conn {
            SessionConn::Owned(conn) => {
                let mut tx = sqlx::Connection::begin(&mut **conn).await?;
                let affected = apply_staged(&mut tx, &staged).await?;
                tx.commit().await?;
                Ok(affected)
            }
            SessionConn::Shared(guard) => apply_staged(&mut ***guard, &staged).await,
        }
    }
}

async fn apply_staged<E: Entity>(
    conn: &mut PgConnection,
    staged: &[Staged<E>],
) -> Result<u64, RepoError> {
    let mut affected = 0;

    for item in staged {
        let result = match item {
            Staged::Intent(entity, ChangeIntent::Added) => {
                entity
                    .bind_insert(sqlx::query(E::insert_sql()))
                    .execute(&mut *conn)
                    .await?
            }
            Staged::Intent(entity, ChangeIntent::Modified) => {
                entity
                    .bind_update(sqlx::query(E::update_sql()))
                    .execute(&mut *conn)
                    .await?
            }
            Staged::Intent(entity, ChangeIntent::Removed) => {
                sqlx::query(E::delete_sql())
                    .bind(entity.key())
                    .execute(&mut *conn)
                    .await?
            }
            Staged::Fields(entity, properties) => {
                let sql = partial_update_sql::<E>(properties)?;
                let mut query = sqlx::query(&sql);
                for property in properties {
                    query = entity.bind_property(property, query)?;
                }
                query.bind(entity.key()).execute(&mut *conn).await?
            }
        };
        affected += result.rows_affected();
    }

    Ok(affected)
}

/// UPDATE statement covering only the named properties, keyed by primary key
fn partial_update_sql<E: Entity>(properties: &[String]) -> Result<String, RepoError> {
    let mut assignments = Vec::with_capacity(properties.len());
    for (index, property) in properties.iter().enumerate() {
        let column = ColumnMapper::column_for::<E>(property)?;
        assignments.push(format!("{} = ${}", quote_identifier(column), index + 1));
    }

    Ok(format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quote_identifier(E::table_name()),
        assignments.join(", "),
        quote_identifier(E::key_column()),
        properties.len() + 1
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_derive::Entity;

    #[derive(Debug, Clone, Default, Entity)]
    #[entity(table = "widgets")]
    struct Widget {
        #[key]
        id: i32,
        label: String,
        #[column(name = "unit_count")]
        count: i32,
    }

    #[test]
    fn partial_update_sql_covers_named_properties_only() {
        let sql = partial_update_sql::<Widget>(&["label".to_string(), "count".to_string()])
            .expect("mapped properties");

        assert_eq!(
            sql,
            r#"UPDATE "widgets" SET "label" = $1, "unit_count" = $2 WHERE "id" = $3"#
        );
    }

    #[test]
    fn partial_update_sql_rejects_unknown_property() {
        assert!(partial_update_sql::<Widget>(&["missing".to_string()]).is_err());
    }
}
