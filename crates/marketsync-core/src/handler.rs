//! The per-event-kind handler contract: sync and fix callbacks.

use async_trait::async_trait;

use crate::error::IngestError;
use crate::types::RawLog;

/// Handler for one tracked event kind.
///
/// The orchestrator delivers log batches at least once — `on_logs` must be
/// idempotent at the record level (re-ingesting a stored log overwrites it
/// with identical values). `on_block_invalidated` must tolerate unknown
/// hashes and repeated calls; both are independently callable so the
/// orchestrator can serialize syncs and fixes however the chain demands.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Sync callback: process an ordered batch of matching logs and commit
    /// every derived record atomically. A malformed log is skipped, never
    /// fatal; a failed commit aborts the whole batch.
    async fn on_logs(&self, logs: &[RawLog]) -> Result<(), IngestError>;

    /// Fix callback: retract everything previously written under the
    /// invalidated block hash. Zero matching rows is a no-op.
    async fn on_block_invalidated(&self, block_hash: &str) -> Result<(), IngestError>;

    /// Descriptor slug this handler serves (e.g. `"erc20-transfer"`).
    fn kind(&self) -> &str;
}
