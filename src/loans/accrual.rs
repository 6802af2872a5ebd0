//! Monthly compounding interest.
//!
//! Interest is charged once per calendar month. Each month the principal is
//! multiplied by `1 + rate` and rounded to cents before the next month is
//! computed, so ledger state is reproducible to the cent no matter how many
//! months were missed between observations.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::{LoanPolicy, LoanRecord};
use crate::types::{round_cents, UserId};

/// Persisted checkpoint format.
pub const CHECKPOINT_FORMAT: &str = "%Y-%m-%d";

/// What a single accrual did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccrualReport {
    /// Whole calendar months charged.
    pub months: u32,
    /// Interest capitalised into the principal.
    pub interest: Decimal,
    /// Principal after accrual.
    pub principal: Decimal,
}

/// Outcome of accruing every stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchAccrualReport {
    pub accrued: Vec<(UserId, AccrualReport)>,
    pub failed: Vec<(UserId, String)>,
}

impl BatchAccrualReport {
    pub fn total_interest(&self) -> Decimal {
        self.accrued.iter().map(|(_, r)| r.interest).sum()
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whole months from `from` to `to`, counted by calendar month; 0 if `to`
/// is not later.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let diff = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    u32::try_from(diff).unwrap_or(0)
}

/// Parse a stored checkpoint. Anything unparsable counts as "never accrued".
pub fn parse_checkpoint(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(raw.trim(), CHECKPOINT_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(checkpoint = raw, error = %e, "Unparsable loan checkpoint, treating as never accrued");
            None
        }
    }
}

/// Bring a record up to date as of `today`.
pub fn accrue_record(record: &mut LoanRecord, policy: &LoanPolicy, today: NaiveDate) -> AccrualReport {
    let current = month_start(today);

    let Some(checkpoint) = parse_checkpoint(record.checkpoint.as_deref()).map(month_start) else {
        record.set_checkpoint(current);
        return AccrualReport {
            months: 0,
            interest: Decimal::ZERO,
            principal: record.principal,
        };
    };

    let months = months_between(checkpoint, current);
    if months == 0 {
        // Same month, or a checkpoint ahead of the clock: nothing to charge.
        return AccrualReport {
            months: 0,
            interest: Decimal::ZERO,
            principal: record.principal,
        };
    }

    let before = record.principal;
    if before > Decimal::ZERO {
        let factor = Decimal::ONE + policy.rate_for(record.active_count);
        for _ in 0..months {
            record.principal = round_cents(record.principal * factor);
        }
    }
    record.set_checkpoint(current);

    AccrualReport {
        months,
        interest: record.principal - before,
        principal: record.principal,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
