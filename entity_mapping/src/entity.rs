//! The `Entity` capability trait.
//!
//! An entity is any default-constructible struct whose fields map to result
//! columns. Implementations are normally generated with
//! `#[derive(Entity)]` from the `entity-derive` crate, which also produces
//! the static SQL and parameter-binding hooks used by the repository layer.

use crate::errors::{MappingError, MaterializeError};
use crate::mapping::ColumnMapping;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::Postgres;
use std::fmt::Debug;

/// Capability trait for types that participate in persistence.
///
/// Recommended usage:
/// ```ignore
/// use entity_derive::Entity;
///
/// #[derive(Debug, Clone, Default, PartialEq, Entity)]
/// #[entity(table = "customers")]
/// pub struct Customer {
///     #[key]
///     pub id: Uuid,
///
///     pub first_name: String,
///
///     #[column(name = "mail_address")]
///     pub email: String,
/// }
/// ```
pub trait Entity: Clone + Default + Send + Sync + Unpin + Debug + 'static {
    /// The type of the primary key column
    type Key: Clone
        + Send
        + Sync
        + Debug
        + Unpin
        + for<'q> sqlx::Encode<'q, Postgres>
        + sqlx::Type<Postgres>
        + 'static;

    /// The table name in the database
    fn table_name() -> &'static str;

    /// The property/column map for this type, one entry per mappable field
    fn columns() -> &'static [ColumnMapping];

    /// Property name of the primary key field
    fn key_property() -> &'static str;

    /// Column name of the primary key field
    fn key_column() -> &'static str;

    /// Extract the primary key value from an instance
    fn key(&self) -> Self::Key;

    /// SQL for INSERT (with placeholders over every mapped column)
    fn insert_sql() -> &'static str;

    /// SQL for UPDATE of every non-key column, keyed by primary key
    fn update_sql() -> &'static str;

    /// SQL for DELETE by primary key
    fn delete_sql() -> &'static str;

    /// Table-qualified SELECT base (safe to extend with joins)
    fn select_base_sql() -> &'static str;

    /// COUNT base for this table
    fn count_base_sql() -> &'static str;

    /// Build one instance from one result row.
    ///
    /// Starts from `Self::default()`; every mapped column present in the row
    /// decodes into its field, absent columns leave the field default, and a
    /// decode mismatch fails the whole row.
    fn hydrate(row: &PgRow) -> Result<Self, MaterializeError>;

    /// Bind every mapped column value, in column-map order, for `insert_sql`
    fn bind_insert<'q>(
        &self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments>;

    /// Bind every non-key column value followed by the key, for `update_sql`
    fn bind_update<'q>(
        &self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments>;

    /// Bind the value of a single named property.
    ///
    /// Fails with `MappingError::UnknownProperty` when the name does not
    /// match any mapped field.
    fn bind_property<'q>(
        &self,
        property: &str,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<Query<'q, Postgres, PgArguments>, MappingError>;
}
