//! Shared types for SHIFTYCOIN.
//!
//! User identifiers, money helpers and the domain error enum live here so
//! that the game, ledger and loan modules can depend on them without
//! circular references.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User identity
// ---------------------------------------------------------------------------

/// Opaque, stable identifier of a user on the host platform.
///
/// Chat platforms hand out numeric snowflakes, test code prefers names, so
/// the id is kept as a string and both convert into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Decimal places kept for every persisted SC amount.
pub const CENT_PLACES: u32 = 2;

/// Round an amount to whole cents (half away from zero).
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalise a user-supplied amount to whole cents and require it to be
/// positive. The error carries the amount as given.
pub fn positive_cents(amount: Decimal) -> CasinoResult<Decimal> {
    let cents = round_cents(amount);
    if cents <= Decimal::ZERO {
        Err(CasinoError::InvalidAmount(amount))
    } else {
        Ok(cents)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Every recoverable failure the core can report.
///
/// A failed operation leaves ledgers, sessions and loan records exactly as
/// they were before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CasinoError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Insufficient funds: need {needed} SC, have {available} SC")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("A game is already in progress")]
    SessionAlreadyActive,

    #[error("No active game")]
    NoActiveSession,

    #[error("The deck is empty")]
    EmptyDeck,

    #[error("Cannot send SC to yourself")]
    SelfTransfer,

    #[error("Payment request not found: {0}")]
    UnknownRequest(Uuid),

    #[error("User {actor} is not the payer of request {request}")]
    NotRequestPayer { request: Uuid, actor: UserId },

    #[error("Payment request {0} was already fulfilled")]
    RequestAlreadyFulfilled(Uuid),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type CasinoResult<T> = std::result::Result<T, CasinoError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
