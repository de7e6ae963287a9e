//! Checkpointing — persists the orchestrator's position so a restart
//! resumes instead of re-ingesting from scratch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::IngestError;

/// A persisted sync position for one registry on one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    /// Chain slug (e.g. `"ethereum"`).
    pub chain: String,
    /// Registry/deployment identifier.
    pub registry_id: String,
    /// Last block whose batches fully committed.
    pub block_number: u64,
    pub block_hash: String,
    /// Unix timestamp of the save.
    pub updated_at: i64,
}

/// Trait for storing and loading sync checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(
        &self,
        chain: &str,
        registry_id: &str,
    ) -> Result<Option<SyncCheckpoint>, IngestError>;

    /// Save (upsert) a checkpoint.
    async fn save(&self, checkpoint: SyncCheckpoint) -> Result<(), IngestError>;

    /// Delete a checkpoint (e.g. when resetting a deployment).
    async fn delete(&self, chain: &str, registry_id: &str) -> Result<(), IngestError>;
}

/// Manages checkpoint reads/writes for one orchestrator.
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    chain: String,
    registry_id: String,
    /// How often to save (every N blocks).
    save_interval: u64,
    counter: u64,
}

impl CheckpointManager {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        chain: impl Into<String>,
        registry_id: impl Into<String>,
        save_interval: u64,
    ) -> Self {
        Self {
            store,
            chain: chain.into(),
            registry_id: registry_id.into(),
            save_interval: save_interval.max(1),
            counter: 0,
        }
    }

    /// Load the saved checkpoint (`None` if none exists).
    pub async fn load(&self) -> Result<Option<SyncCheckpoint>, IngestError> {
        self.store.load(&self.chain, &self.registry_id).await
    }

    /// Conditionally save every `save_interval` blocks. Call after each
    /// block's batches commit.
    pub async fn maybe_save(
        &mut self,
        block_number: u64,
        block_hash: &str,
    ) -> Result<(), IngestError> {
        self.counter += 1;
        if self.counter >= self.save_interval {
            self.force_save(block_number, block_hash).await?;
        }
        Ok(())
    }

    /// Immediately save (used on shutdown and after reorg recovery). Resets
    /// the interval counter, so the next periodic save is a full interval
    /// away.
    pub async fn force_save(
        &mut self,
        block_number: u64,
        block_hash: &str,
    ) -> Result<(), IngestError> {
        let cp = SyncCheckpoint {
            chain: self.chain.clone(),
            registry_id: self.registry_id.clone(),
            block_number,
            block_hash: block_hash.to_string(),
            updated_at: chrono::Utc::now().timestamp(),
        };
        self.store.save(cp).await?;
        self.counter = 0;
        Ok(())
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory checkpoint store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: Mutex<HashMap<String, SyncCheckpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(chain: &str, registry_id: &str) -> String {
        format!("{chain}:{registry_id}")
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(
        &self,
        chain: &str,
        registry_id: &str,
    ) -> Result<Option<SyncCheckpoint>, IngestError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&Self::key(chain, registry_id))
            .cloned())
    }

    async fn save(&self, checkpoint: SyncCheckpoint) -> Result<(), IngestError> {
        let key = Self::key(&checkpoint.chain, &checkpoint.registry_id);
        self.data.lock().unwrap().insert(key, checkpoint);
        Ok(())
    }

    async fn delete(&self, chain: &str, registry_id: &str) -> Result<(), IngestError> {
        self.data.lock().unwrap().remove(&Self::key(chain, registry_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let mut mgr = CheckpointManager::new(store, "ethereum", "marketplace", 10);

        assert!(mgr.load().await.unwrap().is_none());

        mgr.force_save(1000, "0xabc").await.unwrap();

        let cp = mgr.load().await.unwrap().unwrap();
        assert_eq!(cp.block_number, 1000);
        assert_eq!(cp.block_hash, "0xabc");
        assert_eq!(cp.chain, "ethereum");
    }

    #[tokio::test]
    async fn save_interval_batches_writes() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let mut mgr = CheckpointManager::new(store, "ethereum", "marketplace", 5);

        for i in 1..=4 {
            mgr.maybe_save(i, "0xhash").await.unwrap();
        }
        assert!(mgr.load().await.unwrap().is_none());

        mgr.maybe_save(5, "0xhash5").await.unwrap();
        assert_eq!(mgr.load().await.unwrap().unwrap().block_number, 5);
    }

    #[tokio::test]
    async fn force_save_resets_interval_counter() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let mut mgr = CheckpointManager::new(store, "ethereum", "marketplace", 3);

        // Two blocks in, then an out-of-band save.
        mgr.maybe_save(1, "0x1").await.unwrap();
        mgr.maybe_save(2, "0x2").await.unwrap();
        mgr.force_save(2, "0x2f").await.unwrap();

        // A fresh interval starts: the next two blocks must not save.
        mgr.maybe_save(3, "0x3").await.unwrap();
        mgr.maybe_save(4, "0x4").await.unwrap();
        assert_eq!(mgr.load().await.unwrap().unwrap().block_hash, "0x2f");

        mgr.maybe_save(5, "0x5").await.unwrap();
        assert_eq!(mgr.load().await.unwrap().unwrap().block_hash, "0x5");
    }

    #[tokio::test]
    async fn delete_clears_position() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let mut mgr = CheckpointManager::new(store.clone(), "ethereum", "marketplace", 1);
        mgr.force_save(7, "0x7").await.unwrap();
        store.delete("ethereum", "marketplace").await.unwrap();
        assert!(mgr.load().await.unwrap().is_none());
    }
}
