//! Blackjack rounds played end to end through the casino.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use shiftycoin::game::Outcome;
use shiftycoin::types::CasinoError;

use crate::support::{user, Harness};

#[test]
fn test_hit_then_stand_dealer_busts() {
    let h = Harness::new();
    let alice = user("alice");
    h.casino.adjust_balance(&alice, dec!(50)).unwrap();
    // Player 10 5, dealer 6 7; player hits 3, dealer draws 9.
    h.decks.push(&["10♠", "6♦", "5♥", "7♣", "3♠", "9♠"]);

    let dealt = assert_ok!(h.casino.start_session(&alice, dec!(10)));
    assert_eq!(dealt.player_total, 15);
    assert_eq!(dealt.dealer_cards.len(), 1);
    assert_eq!(dealt.dealer_total, None);

    let hit = assert_ok!(h.casino.hit(&alice));
    assert_eq!(hit.player_total, 18);
    assert!(!hit.finished);

    let done = assert_ok!(h.casino.stand(&alice));
    assert_eq!(done.outcome, Some(Outcome::Win));
    assert_eq!(done.dealer_total, Some(22));
    assert_eq!(done.settlement, Some(dec!(10)));
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(60));
}

#[test]
fn test_one_session_per_user() {
    let h = Harness::new();
    let (alice, bob) = (user("alice"), user("bob"));
    h.decks.push(&["10♠", "6♦", "5♥", "7♣", "9♠"]);
    h.decks.push(&["9♠", "8♦", "7♥", "10♣"]);
    h.decks.push(&["10♥", "10♦", "9♣", "8♠"]);

    assert_ok!(h.casino.start_session(&alice, Decimal::ZERO));
    assert_eq!(h.casino.start_session(&alice, Decimal::ZERO), Err(CasinoError::SessionAlreadyActive));

    // Bob is unaffected by Alice's round.
    assert_ok!(h.casino.start_session(&bob, Decimal::ZERO));
    assert_eq!(h.casino.active_sessions(), 2);

    // Once finished, a new round may start.
    assert_ok!(h.casino.stand(&alice));
    assert_ok!(h.casino.start_session(&alice, Decimal::ZERO));
}

#[test]
fn test_actions_need_a_running_session() {
    let h = Harness::new();
    let alice = user("alice");

    assert_eq!(h.casino.hit(&alice), Err(CasinoError::NoActiveSession));
    assert_eq!(h.casino.stand(&alice), Err(CasinoError::NoActiveSession));
    assert_eq!(h.casino.inspect(&alice), Err(CasinoError::NoActiveSession));

    // Player 10 9 stands on 19 vs dealer 18.
    h.decks.push(&["10♠", "10♦", "9♥", "8♣"]);
    assert_ok!(h.casino.start_session(&alice, Decimal::ZERO));
    assert_ok!(h.casino.stand(&alice));

    assert_eq!(h.casino.hit(&alice), Err(CasinoError::NoActiveSession));
    // The finished round can still be shown.
    let shown = assert_ok!(h.casino.inspect(&alice));
    assert!(shown.finished);
    assert_eq!(shown.settlement, Some(dec!(1.9)));
}

#[test]
fn test_double_natural_pushes() {
    let h = Harness::new();
    let alice = user("alice");
    h.casino.adjust_balance(&alice, dec!(20)).unwrap();
    h.decks.push(&["A♠", "A♦", "K♥", "Q♣"]);

    let snap = assert_ok!(h.casino.start_session(&alice, dec!(20)));
    assert!(snap.finished);
    assert_eq!(snap.outcome, Some(Outcome::Push));
    assert_eq!(snap.settlement, Some(Decimal::ZERO));
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(20));
}

#[test]
fn test_failed_settlement_leaves_round_running() {
    let h = Harness::new();
    let alice = user("alice");
    h.decks.push(&["10♠", "10♦", "9♥", "8♣"]);
    assert_ok!(h.casino.start_session(&alice, Decimal::ZERO));

    h.balances.set_failing(true);
    let err = assert_err!(h.casino.stand(&alice));
    assert!(matches!(err, CasinoError::StorageUnavailable(_)));

    let still = assert_ok!(h.casino.inspect(&alice));
    assert!(!still.finished);
    assert_eq!(still.settlement, None);

    h.balances.set_failing(false);
    let done = assert_ok!(h.casino.stand(&alice));
    assert_eq!(done.settlement, Some(dec!(1.9)));
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(1.9));
}

#[test]
fn test_snapshot_renders_for_chat() {
    let h = Harness::new();
    let alice = user("alice");
    h.decks.push(&["10♠", "10♦", "9♥", "8♣"]);

    let running = h.casino.start_session(&alice, Decimal::ZERO).unwrap().to_string();
    assert!(running.contains("Your hand: 10♠ 9♥ (Total: 19)"));
    assert!(!running.contains("8♣"));

    let done = h.casino.stand(&alice).unwrap().to_string();
    assert!(done.contains("Result: WIN"));
    assert!(done.contains("+1.9"));
}
