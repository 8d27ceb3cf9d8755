//! Row materialization.
//!
//! Converts raw tabular result rows into typed entity instances through the
//! entity's column map. For each row, mapped columns present in the row
//! decode into their fields, unmapped row columns are ignored, and unmapped
//! entity fields keep their default value. A decode mismatch fails the row
//! with `MaterializeError` rather than truncating or null-coalescing.

use crate::entity::Entity;
use crate::errors::{MappingError, MaterializeError};
use crate::mapping::ColumnMapper;
use sqlx::postgres::PgRow;
use std::marker::PhantomData;

/// Materializes result rows into `E` instances.
#[derive(Debug)]
pub struct Materializer<E: Entity> {
    _marker: PhantomData<E>,
}

impl<E: Entity> Materializer<E> {
    /// Create a materializer, validating the column map of `E` up front.
    pub fn new() -> Result<Self, MappingError> {
        ColumnMapper::resolve::<E>()?;
        Ok(Self {
            _marker: PhantomData,
        })
    }

    /// Materialize one row into one entity instance.
    pub fn entity(&self, row: &PgRow) -> Result<E, MaterializeError> {
        E::hydrate(row)
    }

    /// Adapt a row set into a lazy, single-pass entity sequence.
    ///
    /// Rows are consumed as the iterator advances; the sequence cannot be
    /// restarted. Collect into a `Vec` when multiple consumers are needed.
    pub fn iter<I>(&self, rows: I) -> impl Iterator<Item = Result<E, MaterializeError>>
    where
        I: IntoIterator<Item = PgRow>,
    {
        rows.into_iter().map(|row| E::hydrate(&row))
    }
}
