//! Wagers attached to in-progress sessions.
//!
//! A bet of 0 means "no explicit wager": the round settles with the
//! hand-total payout instead.

use rust_decimal::Decimal;

use crate::storage::Slots;
use crate::types::{round_cents, CasinoError, CasinoResult, UserId};

#[derive(Default)]
pub struct BetRegistry {
    bets: Slots<UserId, Decimal>,
}

impl BetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (overwrite) the user's wager.
    pub fn set_bet(&self, user: &UserId, amount: Decimal) -> CasinoResult<()> {
        if amount < Decimal::ZERO {
            return Err(CasinoError::InvalidAmount(amount));
        }
        let amount = round_cents(amount);
        self.bets.with_slot(user, |slot| *slot = Some(amount));
        Ok(())
    }

    pub fn get_bet(&self, user: &UserId) -> Decimal {
        self.bets.with_slot(user, |slot| slot.unwrap_or(Decimal::ZERO))
    }

    pub fn clear_bet(&self, user: &UserId) {
        self.bets.with_slot(user, |slot| *slot = None);
    }

    /// Users with an entry in the registry, including idle ones.
    pub(crate) fn tracked_users(&self) -> usize {
        self.bets.len()
    }
}
