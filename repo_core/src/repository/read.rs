//! Read operations
//!
//! `select` is the single entry point into the query composer; every
//! narrower read shape is a `QuerySpec` with fields left at their
//! defaults. Aggregates run over filtered, non-ordered, non-included
//! compositions.

use crate::errors::RepoError;
use crate::query::{AggregateFunction, QueryComposer, QueryFilter, QuerySpec};
use crate::repository::Repository;
use entity_mapping::{bind_value, Entity, Materializer};
use futures_util::TryStreamExt;
use sqlx::Row;

impl<E: Entity> Repository<E> {
    /// Count rows matching the filter; `None` counts the full extent
    pub async fn count(&self, filter: Option<QueryFilter>) -> Result<i64, RepoError> {
        let composed = QueryComposer::compose_count::<E>(filter.as_ref());

        let mut session = self.open_session().await?;
        let mut query = sqlx::query(composed.sql());
        for value in composed.params() {
            query = bind_value(query, value);
        }

        let row = query.fetch_one(session.connection()).await?;
        Ok(row.try_get("total")?)
    }

    /// Maximum of a property over the filtered extent.
    ///
    /// An empty filtered set is `NotFound`, propagated from the NULL
    /// aggregate rather than swallowed.
    pub async fn max<V>(&self, filter: QueryFilter, property: &str) -> Result<V, RepoError>
    where
        V: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + Unpin,
    {
        self.aggregate(AggregateFunction::Max, filter, property)
            .await
    }

    /// Minimum of a property over the filtered extent
    pub async fn min<V>(&self, filter: QueryFilter, property: &str) -> Result<V, RepoError>
    where
        V: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + Unpin,
    {
        self.aggregate(AggregateFunction::Min, filter, property)
            .await
    }

    async fn aggregate<V>(
        &self,
        function: AggregateFunction,
        filter: QueryFilter,
        property: &str,
    ) -> Result<V, RepoError>
    where
        V: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + Unpin,
    {
        let composed = QueryComposer::compose_aggregate::<E>(function, property, &filter)?;

        let mut session = self.open_session().await?;
        let mut query = sqlx::query(composed.sql());
        for value in composed.params() {
            query = bind_value(query, value);
        }

        let row = query.fetch_one(session.connection()).await?;
        let value: Option<V> = row.try_get("agg")?;
        value.ok_or_else(|| {
            RepoError::NotFound(format!(
                "aggregate over an empty '{}' extent",
                E::table_name()
            ))
        })
    }

    /// Select every entity matching the query spec
    pub async fn select(&self, spec: QuerySpec) -> Result<Vec<E>, RepoError> {
        let materializer = Materializer::<E>::new()?;
        let composed = QueryComposer::compose::<E>(&spec);

        let mut session = self.open_session().await?;
        let mut query = sqlx::query(composed.sql());
        for value in composed.params() {
            query = bind_value(query, value);
        }

        let mut rows = query.fetch(session.connection());
        let mut entities = Vec::new();
        while let Some(row) = rows.try_next().await? {
            entities.push(materializer.entity(&row)?);
        }

        Ok(entities)
    }

    /// Select the first entity matching the query spec, if any.
    ///
    /// No match is an absent result, not an error.
    pub async fn select_one(&self, spec: QuerySpec) -> Result<Option<E>, RepoError> {
        let materializer = Materializer::<E>::new()?;
        let composed = QueryComposer::compose_first::<E>(&spec);

        let mut session = self.open_session().await?;
        let mut query = sqlx::query(composed.sql());
        for value in composed.params() {
            query = bind_value(query, value);
        }

        let row = query.fetch_optional(session.connection()).await?;
        row.map(|row| materializer.entity(&row))
            .transpose()
            .map_err(RepoError::from)
    }
}
