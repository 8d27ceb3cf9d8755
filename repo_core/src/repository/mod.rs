//! Generic repository
//!
//! `Repository<E>` is the facade over query composition, session
//! lifecycle, change staging and raw command execution. Most operations
//! open a fresh session, execute, and release it; while attached to a
//! coordinated transaction, every session joins that transaction instead.

mod core;
mod raw;
mod read;
mod write;

pub use self::core::Repository;
