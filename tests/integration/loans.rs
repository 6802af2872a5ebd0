//! Loans through the casino: disbursement, monthly accrual, repayment,
//! persistence and rollback when storage fails.

use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use shiftycoin::config::AppConfig;
use shiftycoin::engine::Casino;
use shiftycoin::storage::KvStore;
use shiftycoin::types::CasinoError;

use crate::support::{user, Harness};

#[test]
fn test_loan_lifecycle() {
    let h = Harness::new();
    let alice = user("alice");

    let first = assert_ok!(h.casino.take_loan(&alice, dec!(100)));
    assert_eq!(first.balance, dec!(100));
    assert_eq!(first.rate, dec!(0.05));
    assert_eq!(first.active_count, 1);

    // Three months later: 100 -> 105 -> 110.25 -> 115.76
    h.clock.advance_months(3);
    let report = assert_ok!(h.casino.accrue(&alice));
    assert_eq!(report.months, 3);
    assert_eq!(report.principal, dec!(115.76));

    // A second loan in the same month lifts the rate for both.
    let second = assert_ok!(h.casino.take_loan(&alice, dec!(50)));
    assert_eq!(second.accrual.months, 0);
    assert_eq!(second.principal, dec!(165.76));
    assert_eq!(second.rate, dec!(0.07));
    assert_eq!(second.balance, dec!(150));

    h.clock.advance_months(1);
    assert_eq!(assert_ok!(h.casino.accrue(&alice)).principal, dec!(177.36));

    let err = assert_err!(h.casino.repay_loan(&alice, dec!(200)));
    assert_eq!(
        err,
        CasinoError::InsufficientFunds {
            needed: dec!(200),
            available: dec!(150)
        }
    );

    h.casino.adjust_balance(&alice, dec!(100)).unwrap();
    let paid = assert_ok!(h.casino.repay_loan(&alice, dec!(200)));
    assert!(paid.cleared);
    assert_eq!(paid.applied, dec!(177.36));
    assert_eq!(paid.overpayment, dec!(22.64));
    assert_eq!(paid.active_count, 1);
    assert_eq!(paid.rate, dec!(0.05));
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(72.64));
}

#[test]
fn test_missed_months_charged_before_new_draw() {
    let h = Harness::new();
    let alice = user("alice");
    h.casino.take_loan(&alice, dec!(100)).unwrap();

    h.clock.advance_months(2);
    let receipt = assert_ok!(h.casino.take_loan(&alice, dec!(10)));
    assert_eq!(receipt.accrual.months, 2);
    assert_eq!(receipt.accrual.interest, dec!(10.25));
    assert_eq!(receipt.principal, dec!(120.25));
    assert_eq!(receipt.active_count, 2);
}

#[test]
fn test_partial_repayment_keeps_loan_open() {
    let h = Harness::new();
    let alice = user("alice");
    h.casino.take_loan(&alice, dec!(100)).unwrap();

    let paid = assert_ok!(h.casino.repay_loan(&alice, dec!(30)));
    assert!(!paid.cleared);
    assert_eq!(paid.principal, dec!(70));
    assert_eq!(paid.active_count, 1);
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(70));
}

#[test]
fn test_invalid_amounts_rejected() {
    let h = Harness::new();
    let alice = user("alice");

    assert_eq!(h.casino.take_loan(&alice, dec!(0)), Err(CasinoError::InvalidAmount(dec!(0))));
    assert_eq!(h.casino.repay_loan(&alice, dec!(-5)), Err(CasinoError::InvalidAmount(dec!(-5))));
    assert_eq!(h.casino.get_loan_info(&alice).unwrap().active_count, 0);
}

#[test]
fn test_batch_accrual_reports_every_user() {
    let h = Harness::new();
    h.casino.take_loan(&user("alice"), dec!(100)).unwrap();
    h.casino.take_loan(&user("bob"), dec!(200)).unwrap();

    h.clock.advance_months(1);
    let batch = assert_ok!(h.casino.accrue_all());
    assert_eq!(batch.accrued.len(), 2);
    assert!(batch.failed.is_empty());
    assert_eq!(batch.total_interest(), dec!(15));

    // Running again in the same month charges nothing.
    assert_eq!(assert_ok!(h.casino.accrue_all()).total_interest(), dec!(0));

    h.clock.advance_months(1);
    h.loans.set_failing(true);
    let batch = assert_ok!(h.casino.accrue_all());
    assert!(batch.accrued.is_empty());
    assert_eq!(batch.failed.len(), 2);
}

#[test]
fn test_accrual_only_writes_what_changed() {
    let h = Harness::new();
    h.casino.take_loan(&user("alice"), dec!(100)).unwrap();

    // Nothing is due this month, so a read-only store is fine.
    h.loans.set_failing(true);
    let batch = assert_ok!(h.casino.accrue_all());
    assert_eq!(batch.accrued.len(), 1);
    assert!(batch.failed.is_empty());

    let report = assert_ok!(h.casino.accrue(&user("stranger")));
    assert_eq!(report.months, 0);
    assert_eq!(h.loans.keys().unwrap(), vec![user("alice")]);
}

#[test]
fn test_sub_cent_loans_rejected_or_rounded() {
    let h = Harness::new();
    let alice = user("alice");

    for _ in 0..2 {
        assert_eq!(
            h.casino.take_loan(&alice, dec!(0.001)),
            Err(CasinoError::InvalidAmount(dec!(0.001)))
        );
    }
    let record = h.casino.get_loan_info(&alice).unwrap();
    assert_eq!(record.active_count, 0);
    assert_eq!(record.rate, dec!(0.05));

    let receipt = assert_ok!(h.casino.take_loan(&alice, dec!(0.005)));
    assert_eq!(receipt.principal, dec!(0.01));
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(0.01));
}

#[test]
fn test_disbursement_rolls_back_when_balance_write_fails() {
    let h = Harness::new();
    let alice = user("alice");

    h.balances.set_failing(true);
    let err = assert_err!(h.casino.take_loan(&alice, dec!(100)));
    assert!(matches!(err, CasinoError::StorageUnavailable(_)));

    let record = h.casino.get_loan_info(&alice).unwrap();
    assert_eq!(record.active_count, 0);
    assert_eq!(record.principal, dec!(0));
}

#[test]
fn test_loan_write_failure_leaves_balance_alone() {
    let h = Harness::new();
    let alice = user("alice");
    h.casino.take_loan(&alice, dec!(100)).unwrap();

    h.loans.set_failing(true);
    assert!(matches!(
        h.casino.take_loan(&alice, dec!(20)),
        Err(CasinoError::StorageUnavailable(_))
    ));
    assert!(matches!(
        h.casino.repay_loan(&alice, dec!(40)),
        Err(CasinoError::StorageUnavailable(_))
    ));

    // The repayment debit was refunded.
    assert_eq!(h.casino.get_balance(&alice).unwrap(), dec!(100));
    assert_eq!(h.casino.get_loan_info(&alice).unwrap().principal, dec!(100));
}

#[test]
fn test_loans_and_balances_survive_restart() {
    let dir = std::env::temp_dir().join(format!("shiftycoin_it_{}", uuid::Uuid::new_v4()));
    let cfg = AppConfig::parse(&format!(
        r#"
        [casino]
        name = "Test"
        currency = "SC"
        [storage]
        data_dir = "{}"
        "#,
        dir.display()
    ))
    .unwrap();
    let alice = user("alice");

    {
        let casino = Casino::from_config(&cfg).unwrap();
        casino.take_loan(&alice, dec!(100)).unwrap();
        casino.adjust_balance(&alice, dec!(-12.5)).unwrap();
    }

    let casino = Casino::from_config(&cfg).unwrap();
    assert_eq!(casino.get_balance(&alice).unwrap(), dec!(87.5));
    let record = casino.get_loan_info(&alice).unwrap();
    assert_eq!(record.principal, dec!(100));
    assert_eq!(record.active_count, 1);
    assert!(record.checkpoint_date().is_some());

    std::fs::remove_dir_all(&dir).unwrap();
}
