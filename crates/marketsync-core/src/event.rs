//! Normalized write records: token transfers and the maker-side effects
//! they imply.

use serde::{Deserialize, Serialize};

use crate::parser::BaseEventParams;

/// Canonical zero address — synthetic counterparty for mints and burns.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Token-id sentinel for fungible (non-id-bearing) transfers.
pub const TOKEN_ID_NONE: &str = "-1";

/// Token standard of a transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferEventKind {
    Erc20,
    Erc721,
    Erc1155,
}

impl TransferEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
            Self::Erc1155 => "erc1155",
        }
    }
}

impl std::fmt::Display for TransferEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized token transfer, keyed by
/// (block hash, tx hash, log index, kind). Amounts are decimal strings —
/// token amounts routinely exceed u64/f64 range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub kind: TransferEventKind,
    /// `"-1"` for fungible tokens.
    pub token_id: String,
    pub from: String,
    pub to: String,
    /// Arbitrary-precision decimal string, never a float.
    pub amount: String,
    #[serde(flatten)]
    pub base: BaseEventParams,
}

impl TransferEvent {
    /// Identity of the stored row. Re-ingesting a log with the same key is
    /// an overwrite, never a duplicate.
    pub fn unique_key(&self) -> (String, String, u32, &'static str) {
        (
            self.base.block_hash.clone(),
            self.base.tx_hash.clone(),
            self.base.log_index,
            self.kind.as_str(),
        )
    }

    /// Returns `true` if this is a mint/deposit (synthetic sender).
    pub fn is_mint(&self) -> bool {
        self.from == ZERO_ADDRESS
    }

    /// Returns `true` if this is a burn/withdrawal (synthetic recipient).
    pub fn is_burn(&self) -> bool {
        self.to == ZERO_ADDRESS
    }
}

/// Which side of the book a maker's orders sit on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Downstream side-effect record: this maker's order-relevant balance
/// changed and their standing orders need re-validation.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MakerInfo {
    pub side: OrderSide,
    pub maker: String,
    pub contract: String,
    pub token_id: String,
}

impl MakerInfo {
    /// Buy-side maker notification — currency balance changes only ever
    /// bear on bid validity.
    pub fn buy(maker: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            side: OrderSide::Buy,
            maker: maker.into(),
            contract: contract.into(),
            token_id: TOKEN_ID_NONE.into(),
        }
    }
}
