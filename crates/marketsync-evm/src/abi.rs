//! ERC20 transfer-family signatures and 32-byte word decoding.
//!
//! Covers the three chain-native shapes a fungible balance change takes:
//! `Transfer(address,address,uint256)` plus the wrapped-native-token
//! `Deposit(address,uint256)` / `Withdrawal(address,uint256)` pair.

use alloy_primitives::U256;

use marketsync_core::error::IngestError;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// keccak256("Deposit(address,uint256)")
pub const DEPOSIT_TOPIC: &str =
    "0xe1fffcc4923d04b559f4d29a8bfc6cda04eb5b0d3c460751c2402c5c5cc9109c";

/// keccak256("Withdrawal(address,uint256)")
pub const WITHDRAWAL_TOPIC: &str =
    "0x7fcf532c15f0a6db0bd6d0e038bea71d30d808c7d98cb3bf7268a95bf5081b65";

/// Decode an indexed-address topic word (32 bytes, address right-aligned)
/// into canonical lowercase `0x` + 40 hex form.
pub fn word_to_address(word: &str) -> Result<String, IngestError> {
    let hex = word
        .strip_prefix("0x")
        .ok_or_else(|| IngestError::malformed(word, "topic word missing 0x prefix"))?;
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IngestError::malformed(
            word,
            "topic word is not 32 bytes of hex",
        ));
    }
    // Address occupies the low 20 bytes of the word.
    let (padding, addr) = hex.split_at(24);
    if padding.chars().any(|c| c != '0') {
        return Err(IngestError::malformed(
            word,
            "address word has non-zero padding",
        ));
    }
    Ok(format!("0x{}", addr.to_ascii_lowercase()))
}

/// Decode a 32-byte uint word into an arbitrary-precision decimal string.
/// Never goes through floating point — token amounts exceed f64 precision.
pub fn word_to_amount(word: &str) -> Result<String, IngestError> {
    let hex = word
        .strip_prefix("0x")
        .ok_or_else(|| IngestError::malformed(word, "data word missing 0x prefix"))?;
    if hex.is_empty() {
        return Ok("0".into());
    }
    if hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IngestError::malformed(
            word,
            "data word is not a uint256 hex value",
        ));
    }
    let value = U256::from_str_radix(hex, 16)
        .map_err(|e| IngestError::malformed(word, format!("uint256 parse: {e}")))?;
    Ok(value.to_string())
}
