//! Raw log input and event filters.

use serde::{Deserialize, Serialize};

// ─── RawLog ──────────────────────────────────────────────────────────────────

/// A raw EVM log as returned by `eth_getLogs`.
///
/// Numeric fields keep their hex wire form; the lenient `*_u64` accessors
/// below are for ordering and display only. Strict validation happens in
/// [`crate::parser::parse_event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "transactionIndex")]
    pub tx_index: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed")]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number as u64 (0 if malformed).
    pub fn block_number_u64(&self) -> u64 {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the transaction index as u32 (0 if malformed).
    pub fn tx_index_u32(&self) -> u32 {
        parse_hex_u64(&self.tx_index) as u32
    }

    /// Returns the log index as u32 (0 if malformed).
    pub fn log_index_u32(&self) -> u32 {
        parse_hex_u64(&self.log_index) as u32
    }

    /// Returns `true` if the provider flagged this log as removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// The log's primary topic (event signature hash), if present.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }

    /// Delivery-order key: (block number, tx index, log index).
    pub fn order_key(&self) -> (u64, u32, u32) {
        (self.block_number_u64(), self.tx_index_u32(), self.log_index_u32())
    }
}

/// Parse a hex-encoded string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> u64 {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).unwrap_or(0)
}

// ─── EventFilter ─────────────────────────────────────────────────────────────

/// Filter describing which logs an event descriptor subscribes to.
///
/// An empty address allowlist means "all addresses"; the topic0 set holds the
/// signature hashes the descriptor recognizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only match logs from these contract addresses (empty = all addresses).
    pub addresses: Vec<String>,
    /// Only match logs with one of these topic[0] values (empty = all events).
    pub topic0_values: Vec<String>,
}

impl EventFilter {
    /// Create a filter for a single event signature hash.
    pub fn topic0(topic: impl Into<String>) -> Self {
        Self {
            topic0_values: vec![topic.into()],
            ..Default::default()
        }
    }

    /// Add a contract address to the allowlist (builder form).
    pub fn address(mut self, addr: impl Into<String>) -> Self {
        self.addresses.push(addr.into());
        self
    }

    /// Extend the allowlist in place, skipping addresses already present.
    /// Registering a new trackable contract never resets existing entries.
    pub fn push_address(&mut self, addr: impl Into<String>) {
        let addr = addr.into();
        if !self.addresses.iter().any(|a| a.eq_ignore_ascii_case(&addr)) {
            self.addresses.push(addr);
        }
    }

    /// Returns `true` if `address` matches this filter.
    pub fn matches_address(&self, address: &str) -> bool {
        self.addresses.is_empty()
            || self.addresses.iter().any(|a| a.eq_ignore_ascii_case(address))
    }

    /// Returns `true` if `topic0` matches this filter.
    pub fn matches_topic0(&self, topic0: &str) -> bool {
        self.topic0_values.is_empty()
            || self.topic0_values.iter().any(|t| t.eq_ignore_ascii_case(topic0))
    }

    /// Returns `true` if `log` matches both the address and topic0 parts.
    pub fn matches(&self, log: &RawLog) -> bool {
        self.matches_address(&log.address)
            && log.topic0().is_some_and(|t| self.matches_topic0(t))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn log(address: &str, topic0: &str) -> RawLog {
        RawLog {
            address: address.into(),
            topics: vec![topic0.into()],
            data: "0x".into(),
            block_number: "0x64".into(),
            block_hash: "0xaaa".into(),
            tx_hash: "0xbbb".into(),
            tx_index: "0x1".into(),
            log_index: "0x2".into(),
            removed: None,
        }
    }

    #[test]
    fn raw_log_accessors() {
        let l = log("0xabc", "0xsig");
        assert_eq!(l.block_number_u64(), 100);
        assert_eq!(l.tx_index_u32(), 1);
        assert_eq!(l.log_index_u32(), 2);
        assert_eq!(l.order_key(), (100, 1, 2));
        assert!(!l.is_removed());
    }

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1"), 1);
        assert_eq!(parse_hex_u64("0xff"), 255);
        assert_eq!(parse_hex_u64("1234"), 0x1234);
        assert_eq!(parse_hex_u64("not-hex"), 0);
    }

    #[test]
    fn filter_matches_address_case_insensitive() {
        let f = EventFilter::topic0("0xsig").address("0xAbCdEf");
        assert!(f.matches_address("0xabcdef"));
        assert!(!f.matches_address("0x111111"));
    }

    #[test]
    fn empty_allowlist_matches_all_addresses() {
        let f = EventFilter::topic0("0xsig");
        assert!(f.matches(&log("0xanything", "0xsig")));
        assert!(!f.matches(&log("0xanything", "0xother")));
    }

    #[test]
    fn push_address_is_additive_and_dedups() {
        let mut f = EventFilter::topic0("0xsig").address("0xaaa");
        f.push_address("0xbbb");
        f.push_address("0xAAA"); // already present, case-insensitively
        assert_eq!(f.addresses.len(), 2);
        assert!(f.matches_address("0xbbb"));
        assert!(f.matches_address("0xaaa"));
    }
}
