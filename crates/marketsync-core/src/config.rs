//! Ingestion configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a sync orchestrator instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Unique name for this deployment (used for checkpoint keys).
    pub id: String,
    /// Chain to ingest from (e.g. `"ethereum"`).
    pub chain: String,
    /// First block to ingest.
    pub from_block: u64,
    /// Optional end block (bounded backfill). `None` = run forever.
    pub to_block: Option<u64>,
    /// Number of blocks behind head before a block is considered confirmed.
    /// Typical values: 12 (Ethereum PoS), 64 (Ethereum safe), 1 (fast chains).
    pub confirmation_depth: u64,
    /// How many blocks per `eth_getLogs` range during backfill.
    pub batch_size: u64,
    /// Checkpoint save interval (every N blocks).
    pub checkpoint_interval: u64,
    /// Block polling interval in live mode (milliseconds).
    pub poll_interval_ms: u64,
    /// Global accept-orders switch. Off = indexing-only mode: events still
    /// persist, no maker notifications fire.
    pub accept_orders: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            chain: "ethereum".into(),
            from_block: 0,
            to_block: None,
            confirmation_depth: 12,
            batch_size: 1000,
            checkpoint_interval: 100,
            poll_interval_ms: 2000,
            accept_orders: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.chain, "ethereum");
        assert_eq!(cfg.confirmation_depth, 12);
        assert!(cfg.accept_orders);
    }
}
