//! Query composition
//!
//! This module builds filter/order/related-entity-inclusion queries
//! generically over an entity type. Composed queries are read-only values;
//! no I/O happens until a repository enumerates or aggregates them.

pub mod compose;
pub mod filter;
pub mod include;
pub mod ordering;
pub mod spec;

pub use compose::{AggregateFunction, ComposedQuery, QueryComposer};
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use include::Include;
pub use ordering::SortOrder;
pub use spec::QuerySpec;
