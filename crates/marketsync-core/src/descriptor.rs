//! Event descriptors and the dispatch registry.
//!
//! An [`EventInfo`] is the declarative binding for one tracked event kind:
//! its log filter plus the sync/fix handler. The [`EventRegistry`] composes
//! filters additively — registering a new trackable contract for an active
//! kind extends that kind's allowlist instead of re-subscribing.

use std::sync::Arc;

use crate::error::IngestError;
use crate::handler::EventHandler;
use crate::types::{EventFilter, RawLog};

/// Declarative descriptor for one event kind.
#[derive(Clone)]
pub struct EventInfo {
    /// Kind slug, unique within a registry (e.g. `"erc20-transfer"`).
    pub kind: String,
    /// Address/topic filter the orchestrator subscribes with.
    pub filter: EventFilter,
    /// Sync + fix callbacks.
    pub handler: Arc<dyn EventHandler>,
}

impl EventInfo {
    pub fn new(
        kind: impl Into<String>,
        filter: EventFilter,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            kind: kind.into(),
            filter,
            handler,
        }
    }
}

impl std::fmt::Debug for EventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventInfo")
            .field("kind", &self.kind)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Registry of event descriptors, one per kind.
#[derive(Default)]
pub struct EventRegistry {
    descriptors: Vec<EventInfo>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. If the kind is already present, its filter is
    /// extended with the new descriptor's addresses and topics instead of
    /// being replaced.
    pub fn register(&mut self, info: EventInfo) {
        if let Some(existing) = self.descriptors.iter_mut().find(|d| d.kind == info.kind) {
            for addr in info.filter.addresses {
                existing.filter.push_address(addr);
            }
            for topic in info.filter.topic0_values {
                if !existing
                    .filter
                    .topic0_values
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(&topic))
                {
                    existing.filter.topic0_values.push(topic);
                }
            }
            return;
        }
        self.descriptors.push(info);
    }

    /// Extend the address allowlist of an active kind. Returns `false` if
    /// the kind is unknown.
    pub fn extend_addresses<I, S>(&mut self, kind: &str, addrs: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.descriptors.iter_mut().find(|d| d.kind == kind) {
            Some(info) => {
                for addr in addrs {
                    info.filter.push_address(addr);
                }
                true
            }
            None => false,
        }
    }

    /// Look up a descriptor by kind.
    pub fn get(&self, kind: &str) -> Option<&EventInfo> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    /// All registered descriptors, in registration order.
    pub fn descriptors(&self) -> &[EventInfo] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Dispatch a log batch to one kind's sync callback.
    pub async fn sync(&self, kind: &str, logs: &[RawLog]) -> Result<(), IngestError> {
        match self.get(kind) {
            Some(info) => info.handler.on_logs(logs).await,
            None => Ok(()),
        }
    }

    /// Dispatch a fix to every descriptor. The orchestrator calls this for
    /// each invalidated hash; descriptors with no rows under the hash
    /// no-op.
    pub async fn invalidate_block(&self, block_hash: &str) -> Result<(), IngestError> {
        for info in &self.descriptors {
            info.handler.on_block_invalidated(block_hash).await?;
        }
        Ok(())
    }
}
