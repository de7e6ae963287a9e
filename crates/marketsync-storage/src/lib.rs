//! marketsync-storage — pluggable storage backends for MarketSync.
//!
//! Backends:
//! - [`memory`] — in-memory (dev/testing, no persistence)
//! - [`sqlite`] — SQLite via `sqlx` (embedded, single-file persistence)
//! - [`postgres`] — PostgreSQL via `sqlx` (production deployments)
//!
//! Every backend implements both `EventStore` (atomic idempotent transfer
//! batches, block-hash-scoped retraction) and `CheckpointStore`.

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
