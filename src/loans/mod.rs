//! Loan book.
//!
//! Each user has one loan record: outstanding principal, the monthly rate,
//! how many loan draws are outstanding, and the month through which interest
//! has been charged. The rate escalates with the number of outstanding
//! draws: `base + step × (count − 1)`.
//!
//! Every mutation first brings interest up to date at the rate that applied
//! before the change, then edits the record, then moves SC on the balance
//! ledger, all under the user's loan lock.

pub mod accrual;

pub use accrual::{AccrualReport, BatchAccrualReport};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::ledger::BalanceLedger;
use crate::storage::{Entry, KvStore, Table};
use crate::types::{positive_cents, round_cents, CasinoResult, UserId};
use accrual::{accrue_record, CHECKPOINT_FORMAT};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Interest schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanPolicy {
    /// Monthly rate with a single outstanding loan.
    pub base_rate: Decimal,
    /// Added per additional outstanding loan.
    pub rate_step: Decimal,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            base_rate: dec!(0.05), // 5% a month
            rate_step: dec!(0.02), // +2% per extra loan
        }
    }
}

impl LoanPolicy {
    /// Build a policy from float config values.
    pub fn from_rates(base_rate: f64, rate_step: f64) -> Result<Self> {
        let base_rate = Decimal::from_f64(base_rate)
            .context("loan base_rate is not a finite number")?
            .round_dp(6);
        let rate_step = Decimal::from_f64(rate_step)
            .context("loan rate_step is not a finite number")?
            .round_dp(6);
        anyhow::ensure!(base_rate >= Decimal::ZERO, "loan base_rate must not be negative");
        anyhow::ensure!(rate_step >= Decimal::ZERO, "loan rate_step must not be negative");
        Ok(Self { base_rate, rate_step })
    }

    pub fn rate_for(&self, active_count: u32) -> Decimal {
        self.base_rate + self.rate_step * Decimal::from(active_count.saturating_sub(1))
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Persisted loan state of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub principal: Decimal,
    pub rate: Decimal,
    pub active_count: u32,
    /// First day of the last month charged, `YYYY-MM-DD`. Kept as text so
    /// a damaged value degrades to "never accrued" instead of breaking the
    /// whole store.
    #[serde(default, deserialize_with = "lenient_checkpoint")]
    pub checkpoint: Option<String>,
}

/// Accept any JSON value for the checkpoint; only strings survive.
fn lenient_checkpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(raw) => Ok(Some(raw)),
        serde_json::Value::Null => Ok(None),
        other => {
            warn!(checkpoint = %other, "Non-text loan checkpoint, treating as never accrued");
            Ok(None)
        }
    }
}

impl LoanRecord {
    pub fn fresh(policy: &LoanPolicy) -> Self {
        Self {
            principal: Decimal::ZERO,
            rate: policy.rate_for(0),
            active_count: 0,
            checkpoint: None,
        }
    }

    pub fn checkpoint_date(&self) -> Option<NaiveDate> {
        accrual::parse_checkpoint(self.checkpoint.as_deref())
    }

    pub(crate) fn set_checkpoint(&mut self, date: NaiveDate) {
        self.checkpoint = Some(date.format(CHECKPOINT_FORMAT).to_string());
    }

    /// Re-derive the rate from the count and clean float noise from storage.
    fn normalized(mut self, policy: &LoanPolicy) -> Self {
        self.principal = round_cents(self.principal);
        self.rate = policy.rate_for(self.active_count);
        self
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanReceipt {
    pub amount: Decimal,
    /// Interest charged on the previous principal before disbursing.
    pub accrual: AccrualReport,
    pub principal: Decimal,
    pub rate: Decimal,
    pub active_count: u32,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentReceipt {
    pub amount: Decimal,
    pub accrual: AccrualReport,
    /// Portion of `amount` that reduced the principal.
    pub applied: Decimal,
    /// Portion of `amount` refunded to the balance.
    pub overpayment: Decimal,
    pub principal: Decimal,
    pub rate: Decimal,
    pub active_count: u32,
    /// Whether this payment cleared the principal.
    pub cleared: bool,
}

// ---------------------------------------------------------------------------
// Loan book
// ---------------------------------------------------------------------------

pub struct LoanBook {
    records: Table<LoanRecord>,
    balances: Arc<BalanceLedger>,
    policy: LoanPolicy,
    clock: Arc<dyn Clock>,
}

impl LoanBook {
    pub fn new(
        store: Arc<dyn KvStore<LoanRecord>>,
        balances: Arc<BalanceLedger>,
        policy: LoanPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records: Table::new("loans", store),
            balances,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// The user's record, or a fresh one if they never borrowed.
    pub fn get_record(&self, user: &UserId) -> CasinoResult<LoanRecord> {
        Ok(self
            .records
            .get(user)?
            .map(|r| r.normalized(&self.policy))
            .unwrap_or_else(|| LoanRecord::fresh(&self.policy)))
    }

    /// Borrow `amount` SC: accrue, add a loan draw, credit the balance.
    pub fn take_loan(&self, user: &UserId, amount: Decimal) -> CasinoResult<LoanReceipt> {
        let amount = positive_cents(amount)?;
        let today = self.clock.today();

        let receipt = self.records.locked(user, |entry| {
            let previous = entry.load()?;
            let mut record = self.current(previous.clone());

            let accrual = accrue_record(&mut record, &self.policy, today);
            record.active_count += 1;
            record.rate = self.policy.rate_for(record.active_count);
            record.principal = round_cents(record.principal + amount);
            record.set_checkpoint(accrual::month_start(today));
            entry.save(record.clone())?;

            let balance = match self.balances.adjust_balance(user, amount) {
                Ok(balance) => balance,
                Err(e) => {
                    self.restore(entry, user, previous);
                    return Err(e);
                }
            };

            Ok(LoanReceipt {
                amount,
                accrual,
                principal: record.principal,
                rate: record.rate,
                active_count: record.active_count,
                balance,
            })
        })?;

        info!(
            user = %user,
            amount = %amount,
            principal = %receipt.principal,
            rate = %receipt.rate,
            active = receipt.active_count,
            "Loan disbursed"
        );
        Ok(receipt)
    }

    /// Apply a repayment of `amount` SC to the user's loan.
    ///
    /// The caller must already have debited `amount` from the balance; any
    /// overpayment is credited back here.
    pub fn repay_loan(&self, user: &UserId, amount: Decimal) -> CasinoResult<RepaymentReceipt> {
        let amount = positive_cents(amount)?;
        let today = self.clock.today();

        let receipt = self.records.locked(user, |entry| {
            let previous = entry.load()?;
            let mut record = self.current(previous.clone());
            let accrual = accrue_record(&mut record, &self.policy, today);

            let owed = record.principal;
            let (applied, overpayment, cleared) = if owed <= Decimal::ZERO {
                (Decimal::ZERO, amount, false)
            } else if amount >= owed {
                record.principal = Decimal::ZERO;
                record.active_count = record.active_count.saturating_sub(1);
                record.rate = self.policy.rate_for(record.active_count);
                (owed, amount - owed, true)
            } else {
                record.principal = round_cents(owed - amount);
                (amount, Decimal::ZERO, false)
            };
            entry.save(record.clone())?;

            if overpayment > Decimal::ZERO {
                if let Err(e) = self.balances.adjust_balance(user, overpayment) {
                    self.restore(entry, user, previous);
                    return Err(e);
                }
            }

            Ok(RepaymentReceipt {
                amount,
                accrual,
                applied,
                overpayment,
                principal: record.principal,
                rate: record.rate,
                active_count: record.active_count,
                cleared,
            })
        })?;

        info!(
            user = %user,
            amount = %amount,
            applied = %receipt.applied,
            overpayment = %receipt.overpayment,
            principal = %receipt.principal,
            active = receipt.active_count,
            "Loan repayment applied"
        );
        Ok(receipt)
    }

    /// Charge any interest owed for months since the last checkpoint.
    ///
    /// Users who never borrowed get nothing written, and a record is only
    /// saved when accrual actually changed it.
    pub fn accrue(&self, user: &UserId) -> CasinoResult<AccrualReport> {
        let today = self.clock.today();
        let report = self.records.locked(user, |entry| {
            let Some(stored) = entry.load()? else {
                return Ok(AccrualReport {
                    months: 0,
                    interest: Decimal::ZERO,
                    principal: Decimal::ZERO,
                });
            };
            let mut record = stored.clone().normalized(&self.policy);
            let report = accrue_record(&mut record, &self.policy, today);
            if record != stored {
                entry.save(record)?;
            }
            Ok(report)
        })?;

        if report.months > 0 {
            info!(
                user = %user,
                months = report.months,
                interest = %report.interest,
                principal = %report.principal,
                "Interest accrued"
            );
        }
        Ok(report)
    }

    /// Accrue every stored record. One user's failure never stops the rest.
    pub fn accrue_all(&self) -> CasinoResult<BatchAccrualReport> {
        let mut batch = BatchAccrualReport::default();
        for user in self.records.keys()? {
            match self.accrue(&user) {
                Ok(report) => batch.accrued.push((user, report)),
                Err(e) => {
                    warn!(user = %user, error = %e, "Accrual failed for user");
                    batch.failed.push((user, e.to_string()));
                }
            }
        }

        info!(
            accrued = batch.accrued.len(),
            failed = batch.failed.len(),
            interest = %batch.total_interest(),
            "Batch accrual complete"
        );
        Ok(batch)
    }

    fn current(&self, stored: Option<LoanRecord>) -> LoanRecord {
        stored
            .map(|r| r.normalized(&self.policy))
            .unwrap_or_else(|| LoanRecord::fresh(&self.policy))
    }

    /// Put the loan record back after the balance side of an operation failed.
    fn restore(&self, entry: &Entry<'_, LoanRecord>, user: &UserId, previous: Option<LoanRecord>) {
        let restored = previous.unwrap_or_else(|| LoanRecord::fresh(&self.policy));
        if let Err(e) = entry.save(restored) {
            error!(user = %user, error = %e, "Failed to roll back loan record");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
