//! The event store contract — atomic batched persistence plus
//! block-hash-scoped retraction.

use async_trait::async_trait;

use crate::error::IngestError;
use crate::event::TransferEvent;

/// Transactional store for normalized transfer events.
///
/// Implementations include `InMemoryStore`, `SqliteStore`, and
/// `PostgresStore` in `marketsync-storage`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a batch as one atomic unit: either every row is visible
    /// afterwards or none is. Each row upserts on
    /// (block hash, tx hash, log index, kind) — duplicate delivery
    /// overwrites with identical values instead of erroring.
    ///
    /// Fails with [`IngestError::BatchWrite`]; nothing is applied then.
    async fn persist(&self, batch: &[TransferEvent]) -> Result<(), IngestError>;

    /// Delete every stored row whose block hash matches — the sole deletion
    /// path, invoked on reorg. Returns the number of retracted rows; zero
    /// matches is a no-op, not an error, and repeated calls are safe.
    async fn remove_by_block_hash(&self, block_hash: &str) -> Result<u64, IngestError>;

    /// Rows stored under a block hash, ordered by (block, tx, log) position.
    /// Read boundary for the external query layer and for tests.
    async fn transfers_by_block_hash(
        &self,
        block_hash: &str,
    ) -> Result<Vec<TransferEvent>, IngestError>;

    /// Total stored row count.
    async fn transfer_count(&self) -> Result<u64, IngestError>;
}
