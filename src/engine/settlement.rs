//! Settlement: turns a finished round into a balance change.
//!
//! With a registered bet the payout is even money (+bet / −bet). Without
//! one, the round pays a tenth of the player's hand total either way.
//! A push never moves SC.

use rust_decimal::Decimal;
use tracing::info;

use crate::game::{GameSession, Outcome};
use crate::ledger::BalanceLedger;
use crate::types::{round_cents, CasinoResult, UserId};

/// Divisor applied to the hand total when no bet is registered.
const HAND_TOTAL_DIVISOR: Decimal = Decimal::TEN;

/// Signed SC amount for an outcome.
pub fn settlement_amount(outcome: Outcome, player_total: u32, bet: Decimal) -> Decimal {
    let stake = if bet > Decimal::ZERO {
        bet
    } else {
        Decimal::from(player_total) / HAND_TOTAL_DIVISOR
    };

    match outcome {
        Outcome::Win => round_cents(stake),
        Outcome::Lose => -round_cents(stake),
        Outcome::Push => Decimal::ZERO,
    }
}

/// Apply a finished session's payout to the ledger, once.
///
/// Returns the amount applied now, or `None` if the session is still in
/// progress or was already settled.
pub fn settle(
    session: &mut GameSession,
    user: &UserId,
    bet: Decimal,
    ledger: &BalanceLedger,
) -> CasinoResult<Option<Decimal>> {
    let Some(outcome) = session.outcome() else {
        return Ok(None);
    };
    if session.settlement().is_some() {
        return Ok(None);
    }

    let amount = settlement_amount(outcome, session.player_total(), bet);
    let balance = if amount.is_zero() {
        ledger.get_balance(user)?
    } else {
        ledger.adjust_balance(user, amount)?
    };
    session.record_settlement(amount);

    info!(
        user = %user,
        outcome = %outcome,
        player_total = session.player_total(),
        dealer_total = session.dealer_total(),
        bet = %bet,
        amount = %amount,
        balance = %balance,
        "Round settled"
    );
    Ok(Some(amount))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
