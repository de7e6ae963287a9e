//! The sync orchestrator — backfill, live polling, and reorg recovery.
//!
//! # Backfill
//! Fetch logs from the resume point up to `head - confirmation_depth` in
//! `batch_size` ranges. Each range is dispatched per descriptor, then the
//! checkpoint advances.
//!
//! # Live
//! Poll every `poll_interval_ms`. Each confirmed block is pushed onto the
//! [`ChainWindow`]; a parent-hash mismatch yields the invalidated hashes,
//! which are retracted newest-first before ingestion resumes from the fork
//! height. Delivery is at-least-once — the idempotent store makes the
//! replay harmless.

use std::time::Duration;

use tracing::{debug, info, warn};

use marketsync_core::chain::{BlockRef, ChainWindow};
use marketsync_core::checkpoint::{CheckpointManager, CheckpointStore};
use marketsync_core::config::IngestConfig;
use marketsync_core::descriptor::EventRegistry;
use marketsync_core::error::IngestError;
use marketsync_core::types::RawLog;

use crate::provider::{LogFetcher, LogProvider};

/// Blocks of header history to retain for reorg detection.
const WINDOW_CAPACITY: usize = 128;

/// Drives ingestion for one registry of event descriptors.
pub struct SyncOrchestrator<P> {
    config: IngestConfig,
    fetcher: LogFetcher<P>,
    registry: EventRegistry,
    window: ChainWindow,
    checkpoint: CheckpointManager,
    /// Next block number to ingest. Rewound on reorg.
    next_number: u64,
}

impl<P: LogProvider> SyncOrchestrator<P> {
    pub fn new(
        mut config: IngestConfig,
        provider: P,
        registry: EventRegistry,
        checkpoint_store: std::sync::Arc<dyn CheckpointStore>,
    ) -> Self {
        config.batch_size = config.batch_size.max(1);
        let checkpoint = CheckpointManager::new(
            checkpoint_store,
            &config.chain,
            &config.id,
            config.checkpoint_interval,
        );
        Self {
            fetcher: LogFetcher::new(provider, config.batch_size),
            registry,
            window: ChainWindow::new(WINDOW_CAPACITY),
            checkpoint,
            next_number: config.from_block,
            config,
        }
    }

    /// Run until the configured end block, or forever when unbounded.
    pub async fn run(&mut self) -> Result<(), IngestError> {
        if let Some(cp) = self.checkpoint.load().await? {
            info!(
                block = cp.block_number,
                hash = %cp.block_hash,
                "resuming from checkpoint"
            );
            self.next_number = self.next_number.max(cp.block_number + 1);
        }

        let head = self.fetcher.head_number().await?;
        let confirmed = head.saturating_sub(self.config.confirmation_depth);
        let backfill_to = match self.config.to_block {
            Some(to) => to.min(confirmed),
            None => confirmed,
        };

        if self.next_number <= backfill_to {
            info!(from = self.next_number, to = backfill_to, "starting backfill");
            self.backfill(self.next_number, backfill_to).await?;
            self.next_number = backfill_to + 1;
        }

        if self.finished() {
            return Ok(());
        }

        info!(poll_ms = self.config.poll_interval_ms, "entering live mode");
        self.live_loop().await
    }

    /// Backfill `[from, to]` in `batch_size` ranges. Blocks this old are
    /// assumed final, so no header tracking happens here.
    async fn backfill(&mut self, from: u64, to: u64) -> Result<(), IngestError> {
        let batch = self.config.batch_size;
        let mut current = from;

        while current <= to {
            let batch_end = current.saturating_add(batch - 1).min(to);

            let dispatched = self.ingest_range(current, batch_end).await?;

            if let Some(block) = self.fetcher.block(batch_end).await? {
                self.checkpoint.maybe_save(block.number, &block.hash).await?;
            }

            debug!(current, batch_end, total = to, logs = dispatched, "backfill batch done");
            current = batch_end + 1;
        }

        info!(at = to, "backfill complete");
        Ok(())
    }

    async fn live_loop(&mut self) -> Result<(), IngestError> {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            tokio::time::sleep(poll_interval).await;
            self.poll_once().await?;
            if self.finished() {
                return Ok(());
            }
        }
    }

    /// One live-mode poll: ingest every newly confirmed block, handling any
    /// reorg encountered along the way. Returns the number of blocks
    /// ingested (retractions included as progress).
    pub async fn poll_once(&mut self) -> Result<u64, IngestError> {
        let head = self.fetcher.head_number().await?;
        let confirmed = head.saturating_sub(self.config.confirmation_depth);

        let mut progressed = 0;
        while self.next_number <= confirmed {
            if !self.process_next().await? {
                break;
            }
            progressed += 1;
            if self.finished() {
                break;
            }
        }
        Ok(progressed)
    }

    /// Ingest the block at `next_number`, or recover from a reorg there.
    /// Returns `false` when the node doesn't have the block yet.
    async fn process_next(&mut self) -> Result<bool, IngestError> {
        let number = self.next_number;
        let Some(block) = self.fetcher.block(number).await? else {
            return Ok(false);
        };

        match self.window.push(block.clone()) {
            Ok(()) => {
                self.ingest_range(block.number, block.number).await?;
                self.checkpoint.maybe_save(block.number, &block.hash).await?;
                self.next_number = block.number + 1;
            }
            Err(dropped) => {
                self.recover_from_reorg(&block, dropped).await?;
            }
        }
        Ok(true)
    }

    /// Retract every invalidated block newest-first, then rewind so the
    /// replacing branch is re-fetched from the fork height.
    async fn recover_from_reorg(
        &mut self,
        incoming: &BlockRef,
        dropped: Vec<BlockRef>,
    ) -> Result<(), IngestError> {
        warn!(
            at = incoming.number,
            depth = dropped.len(),
            "reorg detected, retracting invalidated blocks"
        );

        for stale in &dropped {
            self.registry.invalidate_block(&stale.hash).await?;
            debug!(number = stale.number, hash = %stale.hash, "block retracted");
        }

        if let Some(oldest) = dropped.last() {
            self.next_number = oldest.number.max(self.config.from_block);
        }

        // Pin the checkpoint to the surviving fork point so a crash here
        // resumes on the new branch.
        if let Some(head) = self.window.head() {
            let (number, hash) = (head.number, head.hash.clone());
            self.checkpoint.force_save(number, &hash).await?;
        }
        Ok(())
    }

    /// Fetch and dispatch logs in `[from, to]` for every descriptor.
    async fn ingest_range(&self, from: u64, to: u64) -> Result<usize, IngestError> {
        let mut dispatched = 0;
        for info in self.registry.descriptors() {
            let logs: Vec<RawLog> = self
                .fetcher
                .logs(from, to, &info.filter)
                .await?
                .into_iter()
                .filter(|log| !log.is_removed() && info.filter.matches(log))
                .collect();
            if logs.is_empty() {
                continue;
            }
            dispatched += logs.len();
            self.registry.sync(&info.kind, &logs).await?;
        }
        Ok(dispatched)
    }

    fn finished(&self) -> bool {
        self.config
            .to_block
            .is_some_and(|to| self.next_number > to)
    }

    /// Next block number the orchestrator will ingest.
    pub fn position(&self) -> u64 {
        self.next_number
    }
}
