//! Base event parsing — the pure step that turns a raw log into its
//! chain-location metadata.
//!
//! `parse_event` depends only on the log itself: reparsing the same log
//! always yields the same [`BaseEventParams`].

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::types::RawLog;

/// Chain-location metadata shared by every normalized event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseEventParams {
    /// Emitting contract address, lowercase `0x…` form.
    pub address: String,
    pub block_number: u64,
    pub block_hash: String,
    pub tx_hash: String,
    pub tx_index: u32,
    pub log_index: u32,
}

/// Parse the base params out of a raw log.
///
/// Fails with [`IngestError::MalformedLog`] if any required address or
/// position field is missing or doesn't decode. No side effects.
pub fn parse_event(log: &RawLog) -> Result<BaseEventParams, IngestError> {
    let context = log_context(log);

    if log.topics.is_empty() {
        return Err(IngestError::malformed(&context, "log has no topics"));
    }

    let address = normalize_address(&log.address)
        .map_err(|reason| IngestError::malformed(&context, reason))?;
    let block_hash = require_hash(&log.block_hash, "blockHash")
        .map_err(|reason| IngestError::malformed(&context, reason))?;
    let tx_hash = require_hash(&log.tx_hash, "transactionHash")
        .map_err(|reason| IngestError::malformed(&context, reason))?;

    let block_number = strict_hex_u64(&log.block_number, "blockNumber")
        .map_err(|reason| IngestError::malformed(&context, reason))?;
    let tx_index = strict_hex_u64(&log.tx_index, "transactionIndex")
        .map_err(|reason| IngestError::malformed(&context, reason))? as u32;
    let log_index = strict_hex_u64(&log.log_index, "logIndex")
        .map_err(|reason| IngestError::malformed(&context, reason))? as u32;

    Ok(BaseEventParams {
        address,
        block_number,
        block_hash,
        tx_hash,
        tx_index,
        log_index,
    })
}

/// Normalize an EVM address to canonical lowercase `0x` + 40 hex chars.
pub fn normalize_address(addr: &str) -> Result<String, String> {
    let hex = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .ok_or_else(|| format!("address missing 0x prefix: {addr}"))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("not a 20-byte hex address: {addr}"));
    }
    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

fn require_hash(value: &str, field: &str) -> Result<String, String> {
    let hex = value
        .strip_prefix("0x")
        .ok_or_else(|| format!("{field} missing 0x prefix"))?;
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{field} is not a 32-byte hash: {value}"));
    }
    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

fn strict_hex_u64(value: &str, field: &str) -> Result<u64, String> {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.is_empty() {
        return Err(format!("{field} is empty"));
    }
    u64::from_str_radix(hex, 16).map_err(|e| format!("{field} invalid hex: {e}"))
}

fn log_context(log: &RawLog) -> String {
    format!("{}:{}", log.tx_hash, log.log_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str =
        "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_T: &str =
        "0xtttttttttttttttttttttttttttttttttttttttttttttttttttttttttttttttt";
    const TX: &str =
        "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn good_log() -> RawLog {
        RawLog {
            address: "0x455E53CBB86018Ac2B8092FdCd39d8444aFFC3F6".into(),
            topics: vec!["0xsig".into()],
            data: "0x".into(),
            block_number: "0x10".into(),
            block_hash: HASH_A.into(),
            tx_hash: TX.into(),
            tx_index: "0x3".into(),
            log_index: "0x7".into(),
            removed: None,
        }
    }

    #[test]
    fn parse_is_deterministic_and_normalizes() {
        let log = good_log();
        let a = parse_event(&log).unwrap();
        let b = parse_event(&log).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.address, "0x455e53cbb86018ac2b8092fdcd39d8444affc3f6");
        assert_eq!(a.block_number, 16);
        assert_eq!(a.tx_index, 3);
        assert_eq!(a.log_index, 7);
        assert_eq!(a.block_hash, HASH_A);
        assert_eq!(a.tx_hash, TX);
    }

    #[test]
    fn rejects_log_without_topics() {
        let mut log = good_log();
        log.topics.clear();
        let err = parse_event(&log).unwrap_err();
        assert!(err.is_per_log());
    }

    #[test]
    fn rejects_bad_address() {
        let mut log = good_log();
        log.address = "0x1234".into();
        assert!(parse_event(&log).is_err());

        log.address = "no-prefix".into();
        assert!(parse_event(&log).is_err());
    }

    #[test]
    fn rejects_non_hash_block_hash() {
        let mut log = good_log();
        log.block_hash = HASH_T.into(); // right length, not hex
        assert!(parse_event(&log).is_err());
        log.block_hash = "0xabc".into(); // too short
        assert!(parse_event(&log).is_err());
    }

    #[test]
    fn rejects_unparseable_positions() {
        let mut log = good_log();
        log.log_index = "0x".into();
        assert!(parse_event(&log).is_err());

        let mut log = good_log();
        log.block_number = "bogus".into();
        assert!(parse_event(&log).is_err());
    }

    #[test]
    fn normalize_address_lowercases() {
        assert_eq!(
            normalize_address("0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD").unwrap(),
            "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"
        );
    }
}
