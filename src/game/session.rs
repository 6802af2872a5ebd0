//! One blackjack round against the house.
//!
//! A session is dealt from its own fresh deck, waits for hit/stand, and
//! finishes exactly once. The outcome is fixed at that moment; re-reading it
//! never mutates the session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cards::{render, score, Card, Deck, BLACKJACK};
use crate::types::{CasinoError, CasinoResult};

/// The dealer draws while below this total.
pub const DEALER_STANDS_ON: u32 = 17;

// ---------------------------------------------------------------------------
// Outcome & phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Push,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "WIN"),
            Outcome::Lose => write!(f, "LOSE"),
            Outcome::Push => write!(f, "PUSH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    AwaitingAction,
    Finished,
}

/// Decide a finished round from the two totals.
pub fn evaluate(player_total: u32, dealer_total: u32) -> Outcome {
    if player_total > BLACKJACK {
        Outcome::Lose
    } else if dealer_total > BLACKJACK || player_total > dealer_total {
        Outcome::Win
    } else if player_total < dealer_total {
        Outcome::Lose
    } else {
        Outcome::Push
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameSession {
    deck: Deck,
    player: Vec<Card>,
    dealer: Vec<Card>,
    outcome: Option<Outcome>,
    settlement: Option<Decimal>,
}

impl GameSession {
    /// Deal player, dealer, player, dealer. A natural 21 resolves at once.
    pub fn deal(mut deck: Deck) -> CasinoResult<Self> {
        let player_first = deck.draw()?;
        let dealer_first = deck.draw()?;
        let player_second = deck.draw()?;
        let dealer_second = deck.draw()?;

        let mut session = Self {
            deck,
            player: vec![player_first, player_second],
            dealer: vec![dealer_first, dealer_second],
            outcome: None,
            settlement: None,
        };

        if session.player_total() == BLACKJACK {
            session.dealer_play()?;
            session.finish();
        }
        Ok(session)
    }

    /// Draw one card for the player and return it.
    pub fn hit(&mut self) -> CasinoResult<Card> {
        self.ensure_in_progress()?;

        let card = self.deck.draw()?;
        self.player.push(card);

        let total = self.player_total();
        if total > BLACKJACK {
            // Busted: the dealer has nothing left to play for.
            self.finish();
        } else if total == BLACKJACK {
            self.dealer_play()?;
            self.finish();
        }
        Ok(card)
    }

    /// End the player's turn and let the dealer play out.
    pub fn stand(&mut self) -> CasinoResult<Outcome> {
        self.ensure_in_progress()?;
        self.dealer_play()?;
        Ok(self.finish())
    }

    fn ensure_in_progress(&self) -> CasinoResult<()> {
        if self.is_finished() {
            Err(CasinoError::NoActiveSession)
        } else {
            Ok(())
        }
    }

    fn dealer_play(&mut self) -> CasinoResult<()> {
        while self.dealer_total() < DEALER_STANDS_ON {
            let card = self.deck.draw()?;
            self.dealer.push(card);
        }
        Ok(())
    }

    fn finish(&mut self) -> Outcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = evaluate(self.player_total(), self.dealer_total());
        self.outcome = Some(outcome);
        outcome
    }

    pub fn phase(&self) -> Phase {
        if self.is_finished() {
            Phase::Finished
        } else {
            Phase::AwaitingAction
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn player_cards(&self) -> &[Card] {
        &self.player
    }

    pub fn dealer_cards(&self) -> &[Card] {
        &self.dealer
    }

    pub fn player_total(&self) -> u32 {
        score(&self.player)
    }

    pub fn dealer_total(&self) -> u32 {
        score(&self.dealer)
    }

    /// Signed SC amount applied to the ledger, once settled.
    pub fn settlement(&self) -> Option<Decimal> {
        self.settlement
    }

    pub(crate) fn record_settlement(&mut self, amount: Decimal) {
        self.settlement = Some(amount);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let finished = self.is_finished();
        SessionSnapshot {
            player_cards: self.player.clone(),
            player_total: self.player_total(),
            dealer_cards: if finished {
                self.dealer.clone()
            } else {
                self.dealer.iter().take(1).copied().collect()
            },
            dealer_total: finished.then(|| self.dealer_total()),
            finished,
            outcome: self.outcome,
            settlement: self.settlement,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// What the front end may show about a session.
///
/// While the round is in progress only the dealer's up card is included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub player_cards: Vec<Card>,
    pub player_total: u32,
    pub dealer_cards: Vec<Card>,
    pub dealer_total: Option<u32>,
    pub finished: bool,
    pub outcome: Option<Outcome>,
    pub settlement: Option<Decimal>,
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Your hand: {} (Total: {})",
            render(&self.player_cards, false),
            self.player_total
        )?;
        match (self.outcome, self.dealer_total) {
            (Some(outcome), Some(dealer_total)) => {
                write!(
                    f,
                    " | Dealer: {} (Total: {}) | Result: {outcome}",
                    render(&self.dealer_cards, false),
                    dealer_total
                )?;
                if let Some(amount) = self.settlement {
                    let sign = if amount.is_sign_negative() { "" } else { "+" };
                    write!(f, " | SC: {sign}{amount}")?;
                }
                Ok(())
            }
            _ => write!(f, " | Dealer shows: {}", render(&self.dealer_cards, false)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
