//! marketsync-core — foundation for the reorg-safe marketplace event
//! ingestion engine.
//!
//! # Architecture
//!
//! ```text
//! SyncOrchestrator (marketsync-evm)
//!        ├── EventRegistry      (per-kind descriptors: filter + callbacks)
//!        │       └── EventHandler  (on_logs / on_block_invalidated)
//!        ├── ChainWindow        (parent-hash chain, invalidated hashes)
//!        ├── CheckpointManager  (crash recovery)
//!        ├── EventStore         (atomic idempotent batches, fix deletion)
//!        └── OrdersUpdatePublisher → MakerQueue (gated side effects)
//! ```

pub mod chain;
pub mod checkpoint;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod handler;
pub mod parser;
pub mod queue;
pub mod store;
pub mod types;

pub use chain::{BlockRef, ChainWindow};
pub use checkpoint::{CheckpointManager, CheckpointStore, SyncCheckpoint};
pub use config::IngestConfig;
pub use descriptor::{EventInfo, EventRegistry};
pub use error::IngestError;
pub use event::{MakerInfo, OrderSide, TransferEvent, TransferEventKind};
pub use handler::EventHandler;
pub use parser::{parse_event, BaseEventParams};
pub use queue::{MakerQueue, MemoryQueue, OrdersUpdatePublisher};
pub use store::EventStore;
pub use types::{EventFilter, RawLog};
