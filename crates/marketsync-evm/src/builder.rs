//! Fluent builder for ingestion configs.
//!
//! # Example
//!
//! ```rust,no_run
//! use marketsync_evm::IngestBuilder;
//!
//! let config = IngestBuilder::new()
//!     .id("marketplace-mainnet")
//!     .chain("ethereum")
//!     .from_block(19_000_000)
//!     .confirmation_depth(12)
//!     .batch_size(500)
//!     .accept_orders(true)
//!     .build_config();
//! ```

use marketsync_core::config::IngestConfig;

/// Fluent builder for [`IngestConfig`].
#[derive(Default)]
pub struct IngestBuilder {
    config: IngestConfig,
}

impl IngestBuilder {
    pub fn new() -> Self {
        Self {
            config: IngestConfig::default(),
        }
    }

    /// Set the deployment ID (used for checkpoint keys).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    /// Set the chain to ingest from.
    pub fn chain(mut self, chain: impl Into<String>) -> Self {
        self.config.chain = chain.into();
        self
    }

    /// Set the start block.
    pub fn from_block(mut self, block: u64) -> Self {
        self.config.from_block = block;
        self
    }

    /// Set the end block (for bounded backfill).
    pub fn to_block(mut self, block: u64) -> Self {
        self.config.to_block = Some(block);
        self
    }

    /// Set confirmation depth (blocks behind head before processing).
    pub fn confirmation_depth(mut self, depth: u64) -> Self {
        self.config.confirmation_depth = depth;
        self
    }

    /// Set the number of blocks per `eth_getLogs` range.
    pub fn batch_size(mut self, size: u64) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set checkpoint save interval (every N blocks).
    pub fn checkpoint_interval(mut self, n: u64) -> Self {
        self.config.checkpoint_interval = n;
        self
    }

    /// Set live mode polling interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Toggle the global accept-orders switch. Off = indexing-only mode.
    pub fn accept_orders(mut self, accept: bool) -> Self {
        self.config.accept_orders = accept;
        self
    }

    /// Build the [`IngestConfig`].
    pub fn build_config(self) -> IngestConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let cfg = IngestBuilder::new().build_config();
        assert_eq!(cfg.chain, "ethereum");
        assert_eq!(cfg.confirmation_depth, 12);
        assert_eq!(cfg.batch_size, 1000);
        assert!(cfg.accept_orders);
    }

    #[test]
    fn builder_custom() {
        let cfg = IngestBuilder::new()
            .id("marketplace-polygon")
            .chain("polygon")
            .from_block(50_000_000)
            .to_block(50_100_000)
            .confirmation_depth(32)
            .batch_size(500)
            .accept_orders(false)
            .build_config();

        assert_eq!(cfg.id, "marketplace-polygon");
        assert_eq!(cfg.chain, "polygon");
        assert_eq!(cfg.from_block, 50_000_000);
        assert_eq!(cfg.to_block, Some(50_100_000));
        assert_eq!(cfg.confirmation_depth, 32);
        assert_eq!(cfg.batch_size, 500);
        assert!(!cfg.accept_orders);
    }
}
