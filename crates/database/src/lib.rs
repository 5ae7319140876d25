//! # Auctions Database Crate
//!
//! This crate is the application-specific interface to the PostgreSQL
//! database that stores realms, items, historical auction snapshots and the
//! derived "current" tables computed from them.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. Callers work with the row structs from
//!   `core-types` and never build queries themselves.
//! - **Batched writes:** Bulk writes are split into multi-row statements of
//!   at most [`BatchSize`] rows, sent one after another.
//! - **Whole-table replacement:** Derived tables are never updated row by
//!   row. They are staged into a shadow table and swapped in by renames
//!   inside one transaction (see [`replace`]).
//!
//! ## Public API
//!
//! - `connect`: establish the connection pool.
//! - `run_migrations`: apply the embedded schema migrations.
//! - `DbRepository`: every read, upsert, append and replace operation.
//! - `DbError`: the error type returned from this crate.

// Declare the modules that constitute this crate.
pub mod batch;
pub mod connection;
pub mod error;
pub mod replace;
pub mod repository;
pub mod tables;

// Re-export the key components to create a clean, public-facing API.
pub use batch::BatchSize;
pub use connection::{connect, run_migrations, PoolSettings};
pub use error::DbError;
pub use repository::DbRepository;
