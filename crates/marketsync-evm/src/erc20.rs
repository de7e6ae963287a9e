//! Generic handler for the ERC20 transfer family.
//!
//! One [`Erc20Handler`] instance serves one [`Erc20Rule`]; the
//! `*_event_info` constructors wire a rule, a store handle, and the
//! maker-update publisher into a registrable [`EventInfo`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use marketsync_core::descriptor::EventInfo;
use marketsync_core::error::IngestError;
use marketsync_core::event::{MakerInfo, TransferEvent, TransferEventKind, TOKEN_ID_NONE};
use marketsync_core::handler::EventHandler;
use marketsync_core::parser::parse_event;
use marketsync_core::queue::OrdersUpdatePublisher;
use marketsync_core::store::EventStore;
use marketsync_core::types::{EventFilter, RawLog};

use crate::rules::Erc20Rule;

/// Sync/fix handler for one signature of the ERC20 transfer family.
pub struct Erc20Handler {
    rule: Erc20Rule,
    store: Arc<dyn EventStore>,
    publisher: OrdersUpdatePublisher,
}

impl Erc20Handler {
    pub fn new(
        rule: Erc20Rule,
        store: Arc<dyn EventStore>,
        publisher: OrdersUpdatePublisher,
    ) -> Self {
        Self {
            rule,
            store,
            publisher,
        }
    }

    /// Decode one log into a transfer record plus the makers it affects.
    fn decode(&self, log: &RawLog) -> Result<(TransferEvent, Vec<MakerInfo>), IngestError> {
        let topic0 = log.topic0().unwrap_or_default();
        if !self.rule.matches(log) {
            return Err(IngestError::UnrecognizedEvent {
                topic0: topic0.to_string(),
            });
        }

        let base = parse_event(log)?;
        let args = self.rule.derive(log)?;

        let makers = args
            .makers
            .iter()
            .map(|maker| MakerInfo::buy(maker, &base.address))
            .collect();

        let event = TransferEvent {
            kind: TransferEventKind::Erc20,
            token_id: TOKEN_ID_NONE.into(),
            from: args.from,
            to: args.to,
            amount: args.amount,
            base,
        };
        Ok((event, makers))
    }
}

#[async_trait]
impl EventHandler for Erc20Handler {
    /// Decode the batch, commit it atomically, then notify makers.
    ///
    /// Per-log failures (malformed or unrecognized logs) are logged and
    /// skipped; only the batch commit itself can fail the call. Maker
    /// publishing runs strictly after the commit and never fails it.
    #[instrument(skip_all, fields(kind = self.rule.kind, logs = logs.len()))]
    async fn on_logs(&self, logs: &[RawLog]) -> Result<(), IngestError> {
        let mut events = Vec::with_capacity(logs.len());
        let mut makers = Vec::new();

        for log in logs {
            match self.decode(log) {
                Ok((event, affected)) => {
                    events.push(event);
                    makers.extend(affected);
                }
                Err(error) if error.is_per_log() => {
                    warn!(%error, tx = %log.tx_hash, "skipping undecodable log");
                }
                Err(error) => return Err(error),
            }
        }

        if events.is_empty() {
            return Ok(());
        }

        self.store.persist(&events).await?;
        debug!(persisted = events.len(), "batch committed");

        self.publisher.publish(makers).await;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = self.rule.kind, block_hash))]
    async fn on_block_invalidated(&self, block_hash: &str) -> Result<(), IngestError> {
        let removed = self.store.remove_by_block_hash(block_hash).await?;
        if removed > 0 {
            debug!(removed, "retracted events for invalidated block");
        }
        Ok(())
    }

    fn kind(&self) -> &str {
        self.rule.kind
    }
}

fn event_info<I, S>(
    rule: Erc20Rule,
    store: Arc<dyn EventStore>,
    publisher: OrdersUpdatePublisher,
    addresses: I,
) -> EventInfo
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut filter = EventFilter::topic0(rule.topic0);
    for addr in addresses {
        filter.push_address(addr);
    }
    EventInfo::new(
        rule.kind,
        filter,
        Arc::new(Erc20Handler::new(rule, store, publisher)),
    )
}

/// Descriptor for `Transfer(address,address,uint256)` on the given
/// currency contracts.
pub fn transfer_event_info<I, S>(
    store: Arc<dyn EventStore>,
    publisher: OrdersUpdatePublisher,
    addresses: I,
) -> EventInfo
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    event_info(Erc20Rule::transfer(), store, publisher, addresses)
}

/// Descriptor for wrapped-native `Deposit(address,uint256)`.
pub fn deposit_event_info<I, S>(
    store: Arc<dyn EventStore>,
    publisher: OrdersUpdatePublisher,
    addresses: I,
) -> EventInfo
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    event_info(Erc20Rule::deposit(), store, publisher, addresses)
}

/// Descriptor for wrapped-native `Withdrawal(address,uint256)`.
pub fn withdrawal_event_info<I, S>(
    store: Arc<dyn EventStore>,
    publisher: OrdersUpdatePublisher,
    addresses: I,
) -> EventInfo
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    event_info(Erc20Rule::withdrawal(), store, publisher, addresses)
}
