//! Log provider abstraction and the range-batching fetcher.
//!
//! [`LogProvider`] is the JSON-RPC seam (`eth_blockNumber`,
//! `eth_getBlockByNumber`, `eth_getLogs`); [`LogFetcher`] layers range
//! splitting and delivery ordering on top of it.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use marketsync_core::chain::BlockRef;
use marketsync_core::error::IngestError;
use marketsync_core::types::{parse_hex_u64, EventFilter, RawLog};

/// Source of chain data. Implementations wrap a JSON-RPC endpoint; tests
/// script one in memory.
#[async_trait]
pub trait LogProvider: Send + Sync {
    /// Current chain head number.
    async fn head_number(&self) -> Result<u64, IngestError>;

    /// Header for a block by number; `None` if the node doesn't have it yet.
    async fn block_by_number(&self, number: u64) -> Result<Option<BlockRef>, IngestError>;

    /// All logs in `[from, to]` matching the filter.
    async fn logs(
        &self,
        from: u64,
        to: u64,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, IngestError>;
}

#[async_trait]
impl<P: LogProvider + ?Sized> LogProvider for Arc<P> {
    async fn head_number(&self) -> Result<u64, IngestError> {
        (**self).head_number().await
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<BlockRef>, IngestError> {
        (**self).block_by_number(number).await
    }

    async fn logs(
        &self,
        from: u64,
        to: u64,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, IngestError> {
        (**self).logs(from, to, filter).await
    }
}

/// Fetcher wrapping a [`LogProvider`] with range batching.
///
/// Nodes reject overly wide `eth_getLogs` ranges, so wide requests are
/// split into `max_range`-sized chunks. Returned logs are sorted into
/// delivery order: (block number, tx index, log index).
pub struct LogFetcher<P> {
    provider: P,
    max_range: u64,
}

impl<P: LogProvider> LogFetcher<P> {
    pub fn new(provider: P, max_range: u64) -> Self {
        Self {
            provider,
            max_range: max_range.max(1),
        }
    }

    pub async fn head_number(&self) -> Result<u64, IngestError> {
        self.provider.head_number().await
    }

    pub async fn block(&self, number: u64) -> Result<Option<BlockRef>, IngestError> {
        self.provider.block_by_number(number).await
    }

    /// Fetch all logs in `[from, to]` matching the filter, in delivery order.
    pub async fn logs(
        &self,
        from: u64,
        to: u64,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, IngestError> {
        if to < from {
            return Ok(vec![]);
        }

        let mut all_logs = Vec::new();
        let mut start = from;
        while start <= to {
            let end = start.saturating_add(self.max_range - 1).min(to);
            let chunk = self.provider.logs(start, end, filter).await?;
            all_logs.extend(chunk);
            start = end + 1;
        }

        all_logs.sort_by_key(RawLog::order_key);
        Ok(all_logs)
    }
}

/// Convert a JSON block response (`eth_getBlockByNumber`) to a [`BlockRef`].
pub fn block_from_json(v: &Value) -> Option<BlockRef> {
    Some(BlockRef {
        number: parse_hex_u64(v["number"].as_str()?),
        hash: v["hash"].as_str()?.to_string(),
        parent_hash: v["parentHash"].as_str()?.to_string(),
    })
}

/// Deserialize an `eth_getLogs` result array.
pub fn logs_from_json(v: Value) -> Result<Vec<RawLog>, IngestError> {
    serde_json::from_value(v).map_err(|e| IngestError::Provider(format!("log decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Provider that records requested ranges and returns one log per block.
    struct RangeRecorder {
        calls: Mutex<Vec<(u64, u64)>>,
    }

    #[async_trait]
    impl LogProvider for RangeRecorder {
        async fn head_number(&self) -> Result<u64, IngestError> {
            Ok(u64::MAX)
        }

        async fn block_by_number(
            &self,
            _number: u64,
        ) -> Result<Option<BlockRef>, IngestError> {
            Ok(None)
        }

        async fn logs(
            &self,
            from: u64,
            to: u64,
            _filter: &EventFilter,
        ) -> Result<Vec<RawLog>, IngestError> {
            self.calls.lock().unwrap().push((from, to));
            // Emit in reverse so the fetcher's ordering is observable.
            Ok((from..=to)
                .rev()
                .map(|n| RawLog {
                    address: "0x0000000000000000000000000000000000000001".into(),
                    topics: vec!["0xsig".into()],
                    data: "0x".into(),
                    block_number: format!("0x{n:x}"),
                    block_hash: format!("0x{n:064x}"),
                    tx_hash: format!("0x{n:064x}"),
                    tx_index: "0x0".into(),
                    log_index: "0x0".into(),
                    removed: None,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn wide_range_is_split_into_chunks() {
        let provider = Arc::new(RangeRecorder {
            calls: Mutex::new(vec![]),
        });
        let fetcher = LogFetcher::new(provider.clone(), 10);

        let logs = fetcher
            .logs(0, 24, &EventFilter::default())
            .await
            .unwrap();

        assert_eq!(
            *provider.calls.lock().unwrap(),
            vec![(0, 9), (10, 19), (20, 24)]
        );
        assert_eq!(logs.len(), 25);
    }

    #[tokio::test]
    async fn logs_come_back_in_delivery_order() {
        let provider = Arc::new(RangeRecorder {
            calls: Mutex::new(vec![]),
        });
        let fetcher = LogFetcher::new(provider, 100);

        let logs = fetcher.logs(5, 8, &EventFilter::default()).await.unwrap();
        let numbers: Vec<u64> = logs.iter().map(RawLog::block_number_u64).collect();
        assert_eq!(numbers, vec![5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn inverted_range_is_empty() {
        let provider = Arc::new(RangeRecorder {
            calls: Mutex::new(vec![]),
        });
        let fetcher = LogFetcher::new(provider.clone(), 10);

        assert!(fetcher
            .logs(10, 5, &EventFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn block_from_json_roundtrip() {
        let v = json!({
            "number": "0x10",
            "hash": "0xaaa",
            "parentHash": "0xbbb",
            "timestamp": "0x5f5e100"
        });
        let block = block_from_json(&v).unwrap();
        assert_eq!(block.number, 16);
        assert_eq!(block.hash, "0xaaa");
        assert_eq!(block.parent_hash, "0xbbb");

        assert!(block_from_json(&json!({"number": "0x10"})).is_none());
    }

    #[test]
    fn logs_from_json_decodes_wire_shape() {
        let v = json!([{
            "address": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            "topics": ["0xsig"],
            "data": "0x",
            "blockNumber": "0x64",
            "blockHash": "0xaaa",
            "transactionHash": "0xbbb",
            "transactionIndex": "0x1",
            "logIndex": "0x2",
            "removed": false
        }]);
        let logs = logs_from_json(v).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number_u64(), 100);
        assert!(!logs[0].is_removed());
    }
}
