//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Errors that can occur while ingesting on-chain events.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The log is missing required address/position fields or carries
    /// values that don't parse. Skip the log, keep the batch going.
    #[error("malformed log at {context}: {reason}")]
    MalformedLog { context: String, reason: String },

    /// topic0 doesn't match any signature this descriptor recognizes.
    #[error("unrecognized event topic {topic0}")]
    UnrecognizedEvent { topic0: String },

    /// The atomic batch commit failed. Nothing was applied; the whole
    /// batch must be retried by the orchestrator.
    #[error("batch write failed: {0}")]
    BatchWrite(String),

    /// Reorg retraction failed. Safe to retry — deletion is idempotent.
    #[error("fix failed for block {block_hash}: {reason}")]
    Fix { block_hash: String, reason: String },

    /// Downstream maker-queue publish failed. Never rolls back writes.
    #[error("queue publish failed: {0}")]
    QueuePublish(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

impl IngestError {
    /// Returns `true` for failures that are contained to a single log
    /// (logged and skipped) rather than aborting the batch.
    pub fn is_per_log(&self) -> bool {
        matches!(
            self,
            Self::MalformedLog { .. } | Self::UnrecognizedEvent { .. }
        )
    }

    /// Shorthand for a [`IngestError::MalformedLog`] with context.
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLog {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_log_errors_are_skippable() {
        assert!(IngestError::malformed("0xabc:0", "no topics").is_per_log());
        assert!(IngestError::UnrecognizedEvent { topic0: "0x0".into() }.is_per_log());
        assert!(!IngestError::BatchWrite("db down".into()).is_per_log());
        assert!(!IngestError::Fix {
            block_hash: "0xdead".into(),
            reason: "db down".into()
        }
        .is_per_log());
    }
}
