//! Downstream maker-update queue publishing.
//!
//! Publishing is best-effort and strictly decoupled from ingestion
//! correctness: a failed publish is logged and dropped, never rolled back
//! into the already-committed event writes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::IngestError;
use crate::event::MakerInfo;

/// Producer interface to the external orders-update work queue.
#[async_trait]
pub trait MakerQueue: Send + Sync {
    /// Enqueue maker records for order re-validation. Fails with
    /// [`IngestError::QueuePublish`] if the queue is unreachable.
    async fn publish(&self, infos: Vec<MakerInfo>) -> Result<(), IngestError>;
}

/// Publisher wrapping a queue handle plus the global accept-orders switch.
///
/// With the switch off the system runs in indexing-only mode: events still
/// persist, nothing is published. The switch is explicit construction-time
/// config, not ambient state, so tests can toggle it per case.
#[derive(Clone)]
pub struct OrdersUpdatePublisher {
    queue: std::sync::Arc<dyn MakerQueue>,
    accept_orders: bool,
}

impl OrdersUpdatePublisher {
    pub fn new(queue: std::sync::Arc<dyn MakerQueue>, accept_orders: bool) -> Self {
        Self {
            queue,
            accept_orders,
        }
    }

    /// Returns `true` if downstream notification is enabled.
    pub fn accepts_orders(&self) -> bool {
        self.accept_orders
    }

    /// Publish the accumulated maker set, deduplicated. Only call after the
    /// owning batch has committed. Failures are logged, never propagated.
    pub async fn publish(&self, mut infos: Vec<MakerInfo>) {
        if !self.accept_orders || infos.is_empty() {
            return;
        }
        // Dedup is an optimization; the downstream consumer is idempotent.
        infos.sort();
        infos.dedup();

        let count = infos.len();
        if let Err(error) = self.queue.publish(infos).await {
            tracing::warn!(%error, count, "maker queue publish failed, dropping notifications");
        }
    }
}

/// In-memory queue for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryQueue {
    published: Mutex<Vec<MakerInfo>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in publish order.
    pub fn published(&self) -> Vec<MakerInfo> {
        self.published.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl MakerQueue for MemoryQueue {
    async fn publish(&self, infos: Vec<MakerInfo>) -> Result<(), IngestError> {
        self.published.lock().unwrap().extend(infos);
        Ok(())
    }
}
