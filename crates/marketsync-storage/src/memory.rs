//! In-memory storage backend.
//!
//! Stores transfer events and checkpoints in RAM under a single lock, so
//! batch persistence is trivially atomic. Useful for tests and short-lived
//! ingesters that don't need persistence.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use marketsync_core::checkpoint::{CheckpointStore, SyncCheckpoint};
use marketsync_core::error::IngestError;
use marketsync_core::event::TransferEvent;
use marketsync_core::store::EventStore;

type EventKey = (String, String, u32, &'static str);

/// In-memory event + checkpoint storage. All data is lost on drop.
#[derive(Default)]
pub struct InMemoryStore {
    events: Mutex<HashMap<EventKey, TransferEvent>>,
    checkpoints: Mutex<HashMap<String, SyncCheckpoint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored events in (block, tx, log) order — test convenience.
    pub fn all_transfers(&self) -> Vec<TransferEvent> {
        let mut events: Vec<_> = self.events.lock().unwrap().values().cloned().collect();
        events.sort_by_key(|e| (e.base.block_number, e.base.tx_index, e.base.log_index));
        events
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn persist(&self, batch: &[TransferEvent]) -> Result<(), IngestError> {
        let mut events = self.events.lock().unwrap();
        for ev in batch {
            events.insert(ev.unique_key(), ev.clone());
        }
        Ok(())
    }

    async fn remove_by_block_hash(&self, block_hash: &str) -> Result<u64, IngestError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|_, ev| ev.base.block_hash != block_hash);
        Ok((before - events.len()) as u64)
    }

    async fn transfers_by_block_hash(
        &self,
        block_hash: &str,
    ) -> Result<Vec<TransferEvent>, IngestError> {
        let mut matched: Vec<_> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|ev| ev.base.block_hash == block_hash)
            .cloned()
            .collect();
        matched.sort_by_key(|e| (e.base.block_number, e.base.tx_index, e.base.log_index));
        Ok(matched)
    }

    async fn transfer_count(&self) -> Result<u64, IngestError> {
        Ok(self.events.lock().unwrap().len() as u64)
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStore {
    async fn load(
        &self,
        chain: &str,
        registry_id: &str,
    ) -> Result<Option<SyncCheckpoint>, IngestError> {
        let key = format!("{chain}:{registry_id}");
        Ok(self.checkpoints.lock().unwrap().get(&key).cloned())
    }

    async fn save(&self, checkpoint: SyncCheckpoint) -> Result<(), IngestError> {
        let key = format!("{}:{}", checkpoint.chain, checkpoint.registry_id);
        self.checkpoints.lock().unwrap().insert(key, checkpoint);
        Ok(())
    }

    async fn delete(&self, chain: &str, registry_id: &str) -> Result<(), IngestError> {
        let key = format!("{chain}:{registry_id}");
        self.checkpoints.lock().unwrap().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsync_core::event::{TransferEventKind, TOKEN_ID_NONE};
    use marketsync_core::parser::BaseEventParams;

    fn ev(block_hash: &str, tx_hash: &str, log_index: u32, amount: &str) -> TransferEvent {
        TransferEvent {
            kind: TransferEventKind::Erc20,
            token_id: TOKEN_ID_NONE.into(),
            from: "0x1111111111111111111111111111111111111111".into(),
            to: "0x2222222222222222222222222222222222222222".into(),
            amount: amount.into(),
            base: BaseEventParams {
                address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".into(),
                block_number: 100,
                block_hash: block_hash.into(),
                tx_hash: tx_hash.into(),
                tx_index: 0,
                log_index,
            },
        }
    }

    #[tokio::test]
    async fn persist_and_count() {
        let store = InMemoryStore::new();
        store
            .persist(&[ev("0xaaa", "0xt1", 0, "100"), ev("0xaaa", "0xt1", 1, "200")])
            .await
            .unwrap();
        assert_eq!(store.transfer_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_delivery_overwrites() {
        let store = InMemoryStore::new();
        store.persist(&[ev("0xaaa", "0xt1", 0, "100")]).await.unwrap();
        store.persist(&[ev("0xaaa", "0xt1", 0, "100")]).await.unwrap();

        assert_eq!(store.transfer_count().await.unwrap(), 1);
        let rows = store.transfers_by_block_hash("0xaaa").await.unwrap();
        assert_eq!(rows[0].amount, "100");
    }

    #[tokio::test]
    async fn remove_is_scoped_to_block_hash() {
        let store = InMemoryStore::new();
        store
            .persist(&[ev("0xaaa", "0xt1", 0, "1"), ev("0xbbb", "0xt2", 0, "2")])
            .await
            .unwrap();

        let removed = store.remove_by_block_hash("0xaaa").await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.transfers_by_block_hash("0xaaa").await.unwrap().is_empty());
        assert_eq!(store.transfers_by_block_hash("0xbbb").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_hash_is_noop() {
        let store = InMemoryStore::new();
        assert_eq!(store.remove_by_block_hash("0xnothing").await.unwrap(), 0);
        // Repeated calls stay safe.
        assert_eq!(store.remove_by_block_hash("0xnothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = InMemoryStore::new();
        let cp = SyncCheckpoint {
            chain: "ethereum".into(),
            registry_id: "marketplace".into(),
            block_number: 1000,
            block_hash: "0xabc".into(),
            updated_at: 0,
        };
        store.save(cp).await.unwrap();
        let loaded = store.load("ethereum", "marketplace").await.unwrap().unwrap();
        assert_eq!(loaded.block_number, 1000);
    }
}
