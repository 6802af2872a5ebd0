//! SC balance ledger.
//!
//! Every mutation is a locked read-modify-write on one user (or two, for
//! transfers). The ledger itself has no overdraft floor: `adjust_balance`
//! applies any signed delta, and callers that need an "insufficient funds"
//! rule go through `debit` or `transfer`.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::storage::{KvStore, Table};
use crate::types::{positive_cents, round_cents, CasinoError, CasinoResult, UserId};

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub from: UserId,
    pub to: UserId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceEntry {
    pub user: UserId,
    pub balance: Decimal,
}

pub struct BalanceLedger {
    table: Table<Decimal>,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn KvStore<Decimal>>) -> Self {
        Self {
            table: Table::new("balances", store),
        }
    }

    /// Current balance, 0 for users never seen.
    pub fn get_balance(&self, user: &UserId) -> CasinoResult<Decimal> {
        Ok(self.table.get(user)?.unwrap_or(Decimal::ZERO))
    }

    /// Apply a signed delta and return the new balance.
    pub fn adjust_balance(&self, user: &UserId, delta: Decimal) -> CasinoResult<Decimal> {
        let balance = self.table.update(user, |current| {
            let next = round_cents(current.unwrap_or(Decimal::ZERO) + delta);
            Ok((next, next))
        })?;
        debug!(user = %user, delta = %delta, balance = %balance, "Balance adjusted");
        Ok(balance)
    }

    /// Withdraw `amount`, failing if the balance doesn't cover it.
    pub fn debit(&self, user: &UserId, amount: Decimal) -> CasinoResult<Decimal> {
        let amount = positive_cents(amount)?;
        self.table.update(user, |current| {
            let available = current.unwrap_or(Decimal::ZERO);
            if available < amount {
                return Err(CasinoError::InsufficientFunds {
                    needed: amount,
                    available,
                });
            }
            let next = round_cents(available - amount);
            Ok((next, next))
        })
    }

    /// Move `amount` from one user to another in a single write.
    pub fn transfer(&self, from: &UserId, to: &UserId, amount: Decimal) -> CasinoResult<TransferReceipt> {
        let amount = positive_cents(amount)?;
        if from == to {
            return Err(CasinoError::SelfTransfer);
        }

        let (from_balance, to_balance) = self.table.update_pair(from, to, |sender, recipient| {
            let available = sender.unwrap_or(Decimal::ZERO);
            if available < amount {
                return Err(CasinoError::InsufficientFunds {
                    needed: amount,
                    available,
                });
            }
            let from_balance = round_cents(available - amount);
            let to_balance = round_cents(recipient.unwrap_or(Decimal::ZERO) + amount);
            Ok((from_balance, to_balance, (from_balance, to_balance)))
        })?;

        info!(from = %from, to = %to, amount = %amount, "Transfer completed");
        Ok(TransferReceipt {
            from: from.clone(),
            to: to.clone(),
            amount,
            from_balance,
            to_balance,
        })
    }

    /// All stored balances, richest first.
    pub fn balances(&self) -> CasinoResult<Vec<BalanceEntry>> {
        let mut entries = self
            .table
            .keys()?
            .into_iter()
            .map(|user| {
                let balance = self.get_balance(&user)?;
                Ok(BalanceEntry { user, balance })
            })
            .collect::<CasinoResult<Vec<_>>>()?;
        entries.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.user.cmp(&b.user)));
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
