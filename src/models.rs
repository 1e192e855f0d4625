// src/models.rs
use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Wallet address, normalized to lowercase so lookups and output agree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct WalletId(String);

impl WalletId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id parses as a 20-byte EVM address.
    pub fn is_evm_address(&self) -> bool {
        Address::from_str(&self.0).is_ok()
    }
}

impl From<String> for WalletId {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<WalletId> for String {
    fn from(id: WalletId) -> Self {
        id.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A borrow or repay event
#[derive(Debug, Clone, PartialEq)]
pub struct AmountEvent {
    pub amount: Decimal,
    pub timestamp: i64, // seconds since epoch
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationEvent {
    pub amount_repaid: Decimal,
    pub seized_collateral: Decimal,
    pub timestamp: i64,
}

/// Current position in one market
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub symbol: String,
    pub supplied_amount: Decimal,
    pub borrowed_amount: Decimal,
}

/// Lending history of a single wallet. Events are not guaranteed to be sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletRecord {
    pub wallet_id: WalletId,
    pub borrow_events: Vec<AmountEvent>,
    pub repay_events: Vec<AmountEvent>,
    pub liquidation_events: Vec<LiquidationEvent>,
    pub token_balances: Vec<TokenBalance>,
}

impl WalletRecord {
    pub fn empty(wallet_id: WalletId) -> Self {
        Self {
            wallet_id,
            borrow_events: Vec::new(),
            repay_events: Vec::new(),
            liquidation_events: Vec::new(),
            token_balances: Vec::new(),
        }
    }
}

/// Score column of an output row: a number, or the literal `Error` when the fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCell {
    Value(u16),
    Error,
}

impl fmt::Display for ScoreCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreCell::Value(v) => write!(f, "{}", v),
            ScoreCell::Error => f.write_str("Error"),
        }
    }
}

impl Serialize for ScoreCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScoreCell::Value(v) => serializer.serialize_u16(*v),
            ScoreCell::Error => serializer.serialize_str("Error"),
        }
    }
}

/// One line of the results table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub wallet_id: WalletId,
    pub score: ScoreCell,
}
