//! Shared fixtures for integration tests.
//!
//! A store whose writes can be switched off, a queue of stacked decks, and
//! a casino wired to a manual clock.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use shiftycoin::cards::{Card, Deck};
use shiftycoin::clock::ManualClock;
use shiftycoin::engine::Casino;
use shiftycoin::loans::LoanRecord;
use shiftycoin::storage::{KvStore, MemoryStore};
use shiftycoin::types::UserId;

// ---------------------------------------------------------------------------
// Flaky store
// ---------------------------------------------------------------------------

/// In-memory store that rejects writes while `fail_writes` is set.
pub struct FlakyStore<V> {
    inner: MemoryStore<V>,
    fail_writes: AtomicBool,
}

impl<V> FlakyStore<V> {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }
}

impl<V: Clone + Send + Sync> KvStore<V> for FlakyStore<V> {
    fn get(&self, key: &UserId) -> Result<Option<V>> {
        self.inner.get(key)
    }

    fn put(&self, key: &UserId, value: V) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("write rejected");
        }
        self.inner.put(key, value)
    }

    fn keys(&self) -> Result<Vec<UserId>> {
        self.inner.keys()
    }
}

// ---------------------------------------------------------------------------
// Decks
// ---------------------------------------------------------------------------

/// Decks handed out in order; falls back to a shuffled deck when empty.
#[derive(Clone, Default)]
pub struct DeckQueue {
    decks: Arc<Mutex<VecDeque<Deck>>>,
}

impl DeckQueue {
    /// Queue a deck that deals `order` front to back (player, dealer,
    /// player, dealer, then hits).
    pub fn push(&self, order: &[&str]) {
        let cards = order.iter().map(|c| c.parse::<Card>().unwrap()).collect();
        self.decks.lock().unwrap().push_back(Deck::stacked(cards));
    }

    pub fn next(&self) -> Deck {
        self.decks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Deck::new(true))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub casino: Casino,
    pub decks: DeckQueue,
    pub clock: Arc<ManualClock>,
    pub balances: Arc<FlakyStore<Decimal>>,
    pub loans: Arc<FlakyStore<LoanRecord>>,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn user(name: &str) -> UserId {
    UserId::from(name)
}

impl Harness {
    pub fn new() -> Self {
        Self::starting(date(2026, 1, 15))
    }

    pub fn starting(today: NaiveDate) -> Self {
        let decks = DeckQueue::default();
        let clock = Arc::new(ManualClock::new(today));
        let balances = Arc::new(FlakyStore::new());
        let loans = Arc::new(FlakyStore::new());

        let source = decks.clone();
        let casino = Casino::builder()
            .balance_store(balances.clone())
            .loan_store(loans.clone())
            .clock(clock.clone())
            .decks(move || source.next())
            .build();

        Self {
            casino,
            decks,
            clock,
            balances,
            loans,
        }
    }
}
