//! Raw command execution
//!
//! The fallback path for anything the query composer cannot express:
//! vendor SQL, stored routines, cursor-level row access. Results
//! materialize through the entity's column map, independent of the
//! composer.

use crate::command::{CommandBehavior, RawCommand};
use crate::errors::RepoError;
use crate::repository::Repository;
use entity_mapping::{bind_value, bind_value_as, DbType, Entity, Materializer};
use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, Postgres, Row};

fn bind_prepared<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &[(Value, Option<DbType>)],
) -> Result<Query<'q, Postgres, PgArguments>, RepoError> {
    for (value, db_type) in values {
        query = match db_type {
            Some(db_type) => bind_value_as(query, value, *db_type)?,
            None => bind_value(query, value),
        };
    }
    Ok(query)
}

async fn apply_timeout(conn: &mut PgConnection, command: &RawCommand) -> Result<(), RepoError> {
    if let Some(millis) = command.timeout_millis() {
        sqlx::query(&format!("SET statement_timeout = {}", millis))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn clear_timeout(conn: &mut PgConnection, command: &RawCommand) {
    if command.timeout_millis().is_some() {
        if let Err(err) = sqlx::query("SET statement_timeout = DEFAULT")
            .execute(conn)
            .await
        {
            tracing::warn!(%err, "failed to reset statement_timeout");
        }
    }
}

impl<E: Entity> Repository<E> {
    /// Run a raw command and materialize its rows into entities
    pub async fn execute_query(&self, command: RawCommand) -> Result<Vec<E>, RepoError> {
        let materializer = Materializer::<E>::new()?;
        let prepared = command.render()?;
        let query = bind_prepared(sqlx::query(&prepared.sql), &prepared.values)?;

        tracing::debug!(table = E::table_name(), sql = %prepared.sql, "execute_query");

        let mut session = self.open_session().await?;
        let conn = session.connection();
        apply_timeout(&mut *conn, &command).await?;

        let result = {
            let mut rows = query.fetch(&mut *conn);
            let mut entities = Vec::new();
            loop {
                match rows.try_next().await {
                    Ok(Some(row)) => match materializer.entity(&row) {
                        Ok(entity) => entities.push(entity),
                        Err(err) => break Err(RepoError::from(err)),
                    },
                    Ok(None) => break Ok(entities),
                    Err(err) => break Err(RepoError::from(err)),
                }
            }
        };

        clear_timeout(&mut *conn, &command).await;
        result
    }

    /// Run a raw command and return its single scalar result
    pub async fn execute_scalar<V>(&self, command: RawCommand) -> Result<V, RepoError>
    where
        V: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + Unpin,
    {
        let prepared = command.render()?;
        let query = bind_prepared(sqlx::query(&prepared.sql), &prepared.values)?;

        let mut session = self.open_session().await?;
        let conn = session.connection();
        apply_timeout(&mut *conn, &command).await?;

        let result = query.fetch_optional(&mut *conn).await;

        clear_timeout(&mut *conn, &command).await;

        let row = result?.ok_or_else(|| {
            RepoError::NotFound("scalar command returned no rows".to_string())
        })?;
        Ok(row.try_get(0)?)
    }

    /// Run a raw command, invoking `on_row` once per row while the cursor
    /// is open. The callback sees the raw row, not a materialized entity;
    /// this is the lowest-level escape hatch. Returns the rows seen.
    pub async fn execute_reader<F>(
        &self,
        command: RawCommand,
        mut on_row: F,
    ) -> Result<u64, RepoError>
    where
        F: FnMut(&PgRow) -> Result<(), RepoError> + Send,
    {
        let prepared = command.render()?;
        let query = bind_prepared(sqlx::query(&prepared.sql), &prepared.values)?;

        let mut session = self.open_session().await?;
        let conn = session.connection();
        apply_timeout(&mut *conn, &command).await?;

        let result = {
            let mut rows = query.fetch(&mut *conn);
            let mut seen = 0u64;
            loop {
                match rows.try_next().await {
                    Ok(Some(row)) => {
                        if let Err(err) = on_row(&row) {
                            break Err(err);
                        }
                        seen += 1;
                        if command.behavior() == CommandBehavior::SingleRow {
                            break Ok(seen);
                        }
                    }
                    Ok(None) => break Ok(seen),
                    Err(err) => break Err(RepoError::from(err)),
                }
            }
        };

        clear_timeout(&mut *conn, &command).await;
        result
    }

    /// Run a raw command that returns no rows; yields affected rows
    pub async fn execute_non_query(&self, command: RawCommand) -> Result<u64, RepoError> {
        let prepared = command.render()?;
        let query = bind_prepared(sqlx::query(&prepared.sql), &prepared.values)?;

        let mut session = self.open_session().await?;
        let conn = session.connection();
        apply_timeout(&mut *conn, &command).await?;

        let result = query.execute(&mut *conn).await;

        clear_timeout(&mut *conn, &command).await;
        Ok(result?.rows_affected())
    }
}
