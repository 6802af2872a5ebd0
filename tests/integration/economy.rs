//! Moving SC between users: bets, transfers, payment requests and the
//! leaderboard.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;
use tokio_test::{assert_err, assert_ok};

use shiftycoin::notify::Delivery;
use shiftycoin::types::CasinoError;

use crate::support::{user, Harness};

#[test]
fn test_transfer_reports_both_balances() {
    let h = Harness::new();
    let (alice, bob) = (user("alice"), user("bob"));
    h.casino.adjust_balance(&alice, dec!(30)).unwrap();

    let sent = assert_ok!(h.casino.transfer(&alice, &bob, dec!(12.5)));
    assert_eq!(sent.value.from_balance, dec!(17.5));
    assert_eq!(sent.value.to_balance, dec!(12.5));
    assert!(sent.delivery.is_delivered());

    assert_eq!(h.casino.transfer(&bob, &bob, dec!(1)).unwrap_err(), CasinoError::SelfTransfer);
}

#[test]
fn test_payment_request_paid_once() {
    let h = Harness::new();
    let (alice, bob, carol) = (user("alice"), user("bob"), user("carol"));
    h.casino.adjust_balance(&bob, dec!(50)).unwrap();

    let request = assert_ok!(h.casino.request_payment(&alice, &bob, dec!(20))).value;
    assert!(!request.consumed);

    // Only the payer may accept.
    let err = assert_err!(h.casino.fulfill_request(&request.id, &carol));
    assert!(matches!(err, CasinoError::NotRequestPayer { .. }));

    let paid = assert_ok!(h.casino.fulfill_request(&request.id, &bob));
    assert_eq!(paid.value.from, bob);
    assert_eq!(paid.value.to, alice);
    assert_eq!(paid.delivery, Delivery::Delivered);

    assert_eq!(
        h.casino.fulfill_request(&request.id, &bob),
        Err(CasinoError::RequestAlreadyFulfilled(request.id))
    );
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(20));
    assert_eq!(h.casino.get_balance(&bob).unwrap(), dec!(30));
    assert!(h.casino.get_request(&request.id).unwrap().consumed);
}

#[test]
fn test_unfunded_request_can_be_retried() {
    let h = Harness::new();
    let (alice, bob) = (user("alice"), user("bob"));

    let request = h.casino.request_payment(&alice, &bob, dec!(20)).unwrap().value;
    assert!(matches!(
        h.casino.fulfill_request(&request.id, &bob),
        Err(CasinoError::InsufficientFunds { .. })
    ));
    assert!(!h.casino.get_request(&request.id).unwrap().consumed);

    h.casino.adjust_balance(&bob, dec!(20)).unwrap();
    assert_ok!(h.casino.fulfill_request(&request.id, &bob));
    assert_eq!(h.casino.get_balance(&bob).unwrap(), Decimal::ZERO);
}

#[test]
fn test_unknown_request() {
    let h = Harness::new();
    let id = uuid::Uuid::new_v4();
    assert_eq!(
        h.casino.fulfill_request(&id, &user("bob")),
        Err(CasinoError::UnknownRequest(id))
    );
}

#[test]
fn test_bet_registry_round_trip() {
    let h = Harness::new();
    let alice = user("alice");

    assert_eq!(h.casino.get_bet(&alice), Decimal::ZERO);
    assert_ok!(h.casino.set_bet(&alice, dec!(15)));
    assert_eq!(h.casino.get_bet(&alice), dec!(15));
    assert_eq!(h.casino.set_bet(&alice, dec!(-1)), Err(CasinoError::InvalidAmount(dec!(-1))));
    assert_eq!(h.casino.get_bet(&alice), dec!(15));
}

#[test]
fn test_leaderboard_orders_by_balance() {
    let h = Harness::new();
    h.casino.adjust_balance(&user("alice"), dec!(10)).unwrap();
    h.casino.adjust_balance(&user("bob"), dec!(90)).unwrap();
    h.casino.take_loan(&user("carol"), dec!(40)).unwrap();

    let board: Vec<_> = h
        .casino
        .balances()
        .unwrap()
        .into_iter()
        .map(|e| (e.user.to_string(), e.balance))
        .collect();
    assert_eq!(
        board,
        vec![
            ("bob".to_string(), dec!(90)),
            ("carol".to_string(), dec!(40)),
            ("alice".to_string(), dec!(10)),
        ]
    );
}

#[test]
fn test_concurrent_activity_conserves_sc() {
    let h = Arc::new(Harness::new());
    let users: Vec<_> = ["a", "b", "c", "d"].into_iter().map(user).collect();
    for u in &users {
        h.casino.adjust_balance(u, dec!(100)).unwrap();
    }

    let workers: Vec<_> = (0..users.len())
        .map(|i| {
            let h = Arc::clone(&h);
            let from = users[i].clone();
            let to = users[(i + 1) % users.len()].clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    h.casino.transfer(&from, &to, dec!(0.75)).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let total: Decimal = users.iter().map(|u| h.casino.get_balance(u).unwrap()).sum();
    assert_eq!(total, dec!(400));
}

#[test]
fn test_sub_cent_transfers_mint_nothing() {
    let h = Harness::new();
    let (alice, bob) = (user("alice"), user("bob"));
    h.casino.adjust_balance(&alice, dec!(20)).unwrap();

    for _ in 0..10 {
        let sent = assert_ok!(h.casino.transfer(&alice, &bob, dec!(0.005)));
        assert_eq!(sent.value.amount, dec!(0.01));
    }
    assert_err!(h.casino.transfer(&alice, &bob, dec!(0.004)));

    let total = h.casino.get_balance(&alice).unwrap() + h.casino.get_balance(&bob).unwrap();
    assert_eq!(total, dec!(20));
    assert_eq!(h.casino.get_balance(&bob).unwrap(), dec!(0.10));
}

#[test]
fn test_paid_requests_are_forgotten_after_ttl() {
    let h = Harness::new();
    let (alice, bob) = (user("alice"), user("bob"));
    h.casino.adjust_balance(&bob, dec!(5)).unwrap();

    let request = h.casino.request_payment(&alice, &bob, dec!(5)).unwrap().value;
    assert_ok!(h.casino.fulfill_request(&request.id, &bob));
    assert_eq!(h.casino.pending_requests(), 1);

    // Default TTL is a day, so a paid request still answers "already paid".
    assert_eq!(h.casino.prune_requests(), 0);
    assert_eq!(
        h.casino.fulfill_request(&request.id, &bob),
        Err(CasinoError::RequestAlreadyFulfilled(request.id))
    );
}

