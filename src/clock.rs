//! Calendar source for loan accrual.
//!
//! Interest is charged per calendar month, so the loan book asks a `Clock`
//! for today's date instead of reading the system time directly.

use chrono::{Months, NaiveDate, Utc};
use std::sync::Mutex;

use crate::storage::locks::lock;

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Today's date in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock that only moves when told to. Used for replays and tests.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *lock(&self.today) = date;
    }

    /// Move forward by whole calendar months (day clamped to month end).
    pub fn advance_months(&self, months: u32) {
        let mut today = lock(&self.today);
        if let Some(next) = today.checked_add_months(Months::new(months)) {
            *today = next;
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *lock(&self.today)
    }
}
