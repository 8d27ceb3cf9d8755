//! Repo Core - generic data-access layer for Repohaus
//!
//! This crate provides the repository facade and its working parts: query
//! composition, raw command execution with result materialization, session
//! lifecycle, and cross-repository transaction coordination.

pub mod command;
pub mod errors;
pub mod prelude;
pub mod query;
pub mod repository;
pub mod session;
pub mod transaction;

pub use command::{
    CommandBehavior, CommandKind, CommandParams, ParameterBinder, ParameterDescriptor,
    ParameterDirection, RawCommand,
};
pub use errors::RepoError;
pub use query::{
    ComposedQuery, Include, QueryComposer, QueryFilter, QueryOperator, QuerySpec, SortOrder,
};
pub use repository::Repository;
pub use session::{ChangeIntent, Session, SessionFactory};
pub use transaction::{
    IsolationLevel, TransactionCoordinator, TransactionHandle, TransactionParticipant,
};

use sqlx::PgPool;

pub type DbPool = PgPool;
