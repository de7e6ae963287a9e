//! marketsync-evm — ERC20 event descriptors, log provider, and the sync
//! orchestrator.

pub mod abi;
pub mod builder;
pub mod erc20;
pub mod provider;
pub mod rules;
pub mod sync;

pub use builder::IngestBuilder;
pub use erc20::{
    deposit_event_info, transfer_event_info, withdrawal_event_info, Erc20Handler,
};
pub use provider::{LogFetcher, LogProvider};
pub use rules::{AddressRule, Erc20Rule};
pub use sync::SyncOrchestrator;
