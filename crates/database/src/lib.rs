//! # Kaldor Database Crate
//!
//! This crate is the read-only window onto the `bbw_measurements` table that the
//! ingestion side of the platform fills.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate encapsulates all database-specific logic. It
//!   hands back plain `core-types` rows and hides the SQL.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent access.
//! - **Read Only:** Nothing here writes; the analytics service never persists results.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `DbRepository`: Holds the pool and provides the measurement queries.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::connect;
pub use error::DbError;
pub use repository::DbRepository;
