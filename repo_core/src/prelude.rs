//! Convenience re-exports for common repo-core usage

// Repository facade
pub use crate::repository::Repository;

// Query composition
pub use crate::query::{
    ComposedQuery, Include, QueryComposer, QueryFilter, QueryOperator, QuerySpec, SortOrder,
};

// Raw command surface
pub use crate::command::{
    CommandBehavior, CommandKind, CommandParams, ParameterBinder, ParameterDescriptor,
    ParameterDirection, RawCommand,
};

// Session lifecycle
pub use crate::session::{ChangeIntent, Session, SessionFactory};

// Transaction coordination
pub use crate::transaction::{
    IsolationLevel, TransactionCoordinator, TransactionHandle, TransactionParticipant,
};

// Error type
pub use crate::errors::RepoError;

// Mapping layer
pub use entity_mapping::{ColumnMapper, ColumnMapping, DbType, Entity, Materializer};

// Common external dependencies that are frequently used
pub use sqlx::{PgPool, Row};
