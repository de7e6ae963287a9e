//! Derivation rules for the ERC20 transfer family.
//!
//! Transfer, Deposit, and Withdrawal logs differ only in which topic
//! carries each counterparty and which side is the synthetic zero address.
//! One rule table captures that, so a single handler serves all three
//! instead of three near-identical ones.

use marketsync_core::error::IngestError;
use marketsync_core::event::ZERO_ADDRESS;
use marketsync_core::types::RawLog;

use crate::abi::{self, DEPOSIT_TOPIC, TRANSFER_TOPIC, WITHDRAWAL_TOPIC};

/// Where a counterparty address comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRule {
    /// Indexed topic at this position (1-based within the log's topics).
    Topic(usize),
    /// The canonical zero address — synthetic mint/burn counterparty.
    Zero,
}

/// Decoded counterparties and amount for one log, plus the makers whose
/// orders the balance change affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Args {
    pub from: String,
    pub to: String,
    /// Decimal string, arbitrary precision.
    pub amount: String,
    /// Real (non-synthetic) counterparties, in from→to order.
    pub makers: Vec<String>,
}

/// Derivation rule for one signature of the ERC20 transfer family.
#[derive(Debug, Clone, Copy)]
pub struct Erc20Rule {
    /// Descriptor slug (e.g. `"erc20-transfer"`).
    pub kind: &'static str,
    /// Event signature hash this rule recognizes.
    pub topic0: &'static str,
    pub from: AddressRule,
    pub to: AddressRule,
}

impl Erc20Rule {
    /// Plain transfer: both counterparties are real; both makers affected.
    pub const fn transfer() -> Self {
        Self {
            kind: "erc20-transfer",
            topic0: TRANSFER_TOPIC,
            from: AddressRule::Topic(1),
            to: AddressRule::Topic(2),
        }
    }

    /// Mint/deposit: synthetic sender, only the recipient's orders affected.
    pub const fn deposit() -> Self {
        Self {
            kind: "erc20-deposit",
            topic0: DEPOSIT_TOPIC,
            from: AddressRule::Zero,
            to: AddressRule::Topic(1),
        }
    }

    /// Burn/withdrawal: synthetic recipient, only the sender's orders affected.
    pub const fn withdrawal() -> Self {
        Self {
            kind: "erc20-withdrawal",
            topic0: WITHDRAWAL_TOPIC,
            from: AddressRule::Topic(1),
            to: AddressRule::Zero,
        }
    }

    /// Returns `true` if the log's primary topic matches this rule.
    pub fn matches(&self, log: &RawLog) -> bool {
        log.topic0()
            .is_some_and(|t| t.eq_ignore_ascii_case(self.topic0))
    }

    /// Derive counterparties, amount, and affected makers from a matching
    /// log. Amount is the first data word on all three signatures.
    pub fn derive(&self, log: &RawLog) -> Result<Erc20Args, IngestError> {
        let from = resolve(self.from, log)?;
        let to = resolve(self.to, log)?;
        let amount = abi::word_to_amount(&log.data)?;

        // Only real addresses carry standing orders; zero-address sides
        // never produce maker notifications.
        let mut makers = Vec::with_capacity(2);
        if matches!(self.from, AddressRule::Topic(_)) {
            makers.push(from.clone());
        }
        if matches!(self.to, AddressRule::Topic(_)) {
            makers.push(to.clone());
        }

        Ok(Erc20Args {
            from,
            to,
            amount,
            makers,
        })
    }
}

fn resolve(rule: AddressRule, log: &RawLog) -> Result<String, IngestError> {
    match rule {
        AddressRule::Zero => Ok(ZERO_ADDRESS.to_string()),
        AddressRule::Topic(idx) => {
            let word = log.topics.get(idx).ok_or_else(|| {
                IngestError::malformed(
                    format!("{}:{}", log.tx_hash, log.log_index),
                    format!("missing indexed topic {idx}"),
                )
            })?;
            abi::word_to_address(word)
        }
    }
}
