//! Entity Mapping - column map and materialization layer for Repohaus
//!
//! This crate provides the foundational types for turning tabular result rows
//! into typed entity instances: the `Entity` capability trait, the per-type
//! column map, the row materializer, and dynamic parameter value binding.

pub mod entity;
pub mod errors;
pub mod mapping;
pub mod materialize;
pub mod value;

pub use entity::Entity;
pub use errors::{MappingError, MaterializeError};
pub use mapping::{ColumnMapper, ColumnMapping};
pub use materialize::Materializer;
pub use value::{bind_value, bind_value_as, DbType, ValueTypeError};
