//! # Boutique Database Crate
//!
//! This crate is the maintenance tool's only door to the storefront's
//! MongoDB database.
//!
//! ## Architectural Principles
//!
//! - **One seam:** every operation goes through the `DocumentStore` trait.
//!   `MongoStore` speaks to a real server; `MemoryStore` keeps documents in
//!   process so operations can be exercised without one.
//! - **Scoped connections:** `with_session` hands a borrowed store to a body
//!   and closes it exactly once afterwards, on success, error, or panic.
//! - **Explicit parameters:** collection names and filters are arguments,
//!   never module-level constants.
//!
//! ## Public API
//!
//! - `connect`: builds a `MongoStore` from a connection string and database name.
//! - `with_session`: the connection lifecycle helper.
//! - `DbRepository`: typed role, user and migration-marker access over a store.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, with_session};
pub use error::DbError;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use repository::DbRepository;
pub use store::{DocumentStore, UpdateOutcome};
