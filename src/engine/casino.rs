//! The casino service, the API the chat front end calls.
//!
//! Owns every per-user store. Rounds settle into the balance ledger and
//! loans pay in and out of it. Transfers carry a best-effort notification.

use anyhow::Result;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::settlement;
use crate::cards::Deck;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::game::{GameSession, SessionSnapshot, SessionTable};
use crate::ledger::{BalanceEntry, BalanceLedger, BetRegistry, PaymentRequest, RequestBook, TransferReceipt};
use crate::loans::{AccrualReport, BatchAccrualReport, LoanBook, LoanPolicy, LoanReceipt, LoanRecord, RepaymentReceipt};
use crate::notify::{Delivery, LogNotifier, Notice, Notifier};
use crate::storage::{JsonFileStore, KvStore, MemoryStore};
use crate::types::{positive_cents, round_cents, CasinoError, CasinoResult, UserId};

/// Produces the fresh deck for each new session.
pub type DeckSource = Arc<dyn Fn() -> Deck + Send + Sync>;

/// A result plus what happened to the notification attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notified<T> {
    #[serde(flatten)]
    pub value: T,
    pub delivery: Delivery,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct CasinoBuilder {
    balance_store: Arc<dyn KvStore<Decimal>>,
    loan_store: Arc<dyn KvStore<LoanRecord>>,
    policy: LoanPolicy,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    decks: DeckSource,
    request_ttl: Duration,
}

impl Default for CasinoBuilder {
    fn default() -> Self {
        Self {
            balance_store: Arc::new(MemoryStore::new()),
            loan_store: Arc::new(MemoryStore::new()),
            policy: LoanPolicy::default(),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            decks: Arc::new(|| Deck::new(true)),
            request_ttl: Duration::days(1),
        }
    }
}

impl CasinoBuilder {
    pub fn balance_store(mut self, store: Arc<dyn KvStore<Decimal>>) -> Self {
        self.balance_store = store;
        self
    }

    pub fn loan_store(mut self, store: Arc<dyn KvStore<LoanRecord>>) -> Self {
        self.loan_store = store;
        self
    }

    pub fn loan_policy(mut self, policy: LoanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn decks(mut self, source: impl Fn() -> Deck + Send + Sync + 'static) -> Self {
        self.decks = Arc::new(source);
        self
    }

    pub fn request_ttl(mut self, ttl: Duration) -> Self {
        self.request_ttl = ttl;
        self
    }

    pub fn build(self) -> Casino {
        let balances = Arc::new(BalanceLedger::new(self.balance_store));
        let loans = LoanBook::new(self.loan_store, Arc::clone(&balances), self.policy, self.clock);
        Casino {
            sessions: SessionTable::new(),
            bets: BetRegistry::new(),
            balances,
            loans,
            requests: RequestBook::new(),
            notifier: self.notifier,
            decks: self.decks,
            request_ttl: self.request_ttl,
        }
    }
}

// ---------------------------------------------------------------------------
// Casino
// ---------------------------------------------------------------------------

pub struct Casino {
    sessions: SessionTable,
    bets: BetRegistry,
    balances: Arc<BalanceLedger>,
    loans: LoanBook,
    requests: RequestBook,
    notifier: Arc<dyn Notifier>,
    decks: DeckSource,
    request_ttl: Duration,
}

impl Casino {
    pub fn builder() -> CasinoBuilder {
        CasinoBuilder::default()
    }

    /// Production wiring: JSON stores under the configured data directory.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let balances: JsonFileStore<Decimal> = JsonFileStore::open(cfg.storage.balances_path())?;
        let loans: JsonFileStore<LoanRecord> = JsonFileStore::open(cfg.storage.loans_path())?;
        let policy = LoanPolicy::from_rates(cfg.loans.base_rate, cfg.loans.rate_step)?;
        let request_ttl = Duration::seconds(i64::try_from(cfg.casino.request_ttl_secs)?);

        Ok(Self::builder()
            .balance_store(Arc::new(balances))
            .loan_store(Arc::new(loans))
            .loan_policy(policy)
            .request_ttl(request_ttl)
            .build())
    }

    // -- Game -------------------------------------------------------------

    /// Deal a new round. `wager` of 0 plays without a bet (hand-total payout).
    ///
    /// The wager is checked against the balance at the deal but not held.
    /// SC moved away during the round stays gone, and a lost round then
    /// settles the full wager even if that takes the balance below zero.
    pub fn start_session(&self, user: &UserId, wager: Decimal) -> CasinoResult<SessionSnapshot> {
        if wager < Decimal::ZERO {
            return Err(CasinoError::InvalidAmount(wager));
        }
        let wager = round_cents(wager);

        let snapshot = self.sessions.start(
            user,
            || (self.decks)(),
            |session| {
                if wager > Decimal::ZERO {
                    let available = self.balances.get_balance(user)?;
                    if available < wager {
                        return Err(CasinoError::InsufficientFunds {
                            needed: wager,
                            available,
                        });
                    }
                }
                // A natural settles right away, against this round's wager.
                settlement::settle(session, user, wager, &self.balances)?;
                self.bets.set_bet(user, wager)
            },
        )?;

        info!(
            user = %user,
            wager = %wager,
            player_total = snapshot.player_total,
            finished = snapshot.finished,
            "Round dealt"
        );
        Ok(snapshot)
    }

    pub fn hit(&self, user: &UserId) -> CasinoResult<SessionSnapshot> {
        self.sessions.advance(user, |session| {
            session.hit()?;
            self.settle(user, session)
        })
    }

    pub fn stand(&self, user: &UserId) -> CasinoResult<SessionSnapshot> {
        self.sessions.advance(user, |session| {
            session.stand()?;
            self.settle(user, session)
        })
    }

    pub fn inspect(&self, user: &UserId) -> CasinoResult<SessionSnapshot> {
        self.sessions.inspect(user)
    }

    /// Discard the user's round and its bet.
    pub fn stop(&self, user: &UserId) -> CasinoResult<()> {
        self.sessions.stop(user)?;
        self.bets.clear_bet(user);
        info!(user = %user, "Round stopped");
        Ok(())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn settle(&self, user: &UserId, session: &mut GameSession) -> CasinoResult<()> {
        settlement::settle(session, user, self.bets.get_bet(user), &self.balances).map(|_| ())
    }

    // -- Bets -------------------------------------------------------------

    pub fn set_bet(&self, user: &UserId, amount: Decimal) -> CasinoResult<()> {
        self.bets.set_bet(user, amount)
    }

    pub fn get_bet(&self, user: &UserId) -> Decimal {
        self.bets.get_bet(user)
    }

    // -- Ledger -----------------------------------------------------------

    pub fn get_balance(&self, user: &UserId) -> CasinoResult<Decimal> {
        self.balances.get_balance(user)
    }

    pub fn adjust_balance(&self, user: &UserId, delta: Decimal) -> CasinoResult<Decimal> {
        self.balances.adjust_balance(user, delta)
    }

    /// Send SC to another user and tell them about it.
    pub fn transfer(&self, from: &UserId, to: &UserId, amount: Decimal) -> CasinoResult<Notified<TransferReceipt>> {
        let receipt = self.balances.transfer(from, to, amount)?;
        let delivery = self.notify(
            to,
            Notice::TransferReceived {
                from: from.clone(),
                amount,
            },
        );
        Ok(Notified {
            value: receipt,
            delivery,
        })
    }

    /// Leaderboard, richest first.
    pub fn balances(&self) -> CasinoResult<Vec<BalanceEntry>> {
        self.balances.balances()
    }

    // -- Payment requests -------------------------------------------------

    pub fn request_payment(
        &self,
        requester: &UserId,
        payer: &UserId,
        amount: Decimal,
    ) -> CasinoResult<Notified<PaymentRequest>> {
        let request = self.requests.create(requester, payer, amount)?;
        let delivery = self.notify(
            payer,
            Notice::PaymentRequested {
                request_id: request.id,
                requester: requester.clone(),
                amount,
            },
        );
        Ok(Notified {
            value: request,
            delivery,
        })
    }

    /// The payer accepts a request; SC moves payer → requester exactly once.
    pub fn fulfill_request(&self, id: &Uuid, actor: &UserId) -> CasinoResult<Notified<TransferReceipt>> {
        let receipt = self.requests.fulfill(id, actor, |request| {
            self.balances.transfer(&request.payer, &request.requester, request.amount)
        })?;
        info!(request = %id, payer = %receipt.from, requester = %receipt.to, amount = %receipt.amount, "Payment request fulfilled");

        let delivery = self.notify(
            &receipt.to,
            Notice::RequestFulfilled {
                request_id: *id,
                payer: receipt.from.clone(),
                amount: receipt.amount,
            },
        );
        Ok(Notified {
            value: receipt,
            delivery,
        })
    }

    pub fn get_request(&self, id: &Uuid) -> CasinoResult<PaymentRequest> {
        self.requests.get(id)
    }

    /// Forget payment requests paid or created longer ago than the TTL.
    pub fn prune_requests(&self) -> usize {
        self.requests.prune(Utc::now(), self.request_ttl)
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    // -- Loans ------------------------------------------------------------

    pub fn take_loan(&self, user: &UserId, amount: Decimal) -> CasinoResult<LoanReceipt> {
        self.loans.take_loan(user, amount)
    }

    /// Pay `amount` SC off the user's loan. Collects the SC first and gives
    /// it back if the loan side fails.
    pub fn repay_loan(&self, user: &UserId, amount: Decimal) -> CasinoResult<RepaymentReceipt> {
        let amount = positive_cents(amount)?;
        self.balances.debit(user, amount)?;

        match self.loans.repay_loan(user, amount) {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                if let Err(refund) = self.balances.adjust_balance(user, amount) {
                    error!(user = %user, amount = %amount, error = %refund, "Failed to refund repayment");
                }
                Err(e)
            }
        }
    }

    pub fn get_loan_info(&self, user: &UserId) -> CasinoResult<LoanRecord> {
        self.loans.get_record(user)
    }

    pub fn accrue(&self, user: &UserId) -> CasinoResult<AccrualReport> {
        self.loans.accrue(user)
    }

    pub fn accrue_all(&self) -> CasinoResult<BatchAccrualReport> {
        self.loans.accrue_all()
    }

    pub fn loan_policy(&self) -> &LoanPolicy {
        self.loans.policy()
    }

    // -- Notifications ----------------------------------------------------

    fn notify(&self, recipient: &UserId, notice: Notice) -> Delivery {
        let delivery = self.notifier.notify(recipient, &notice);
        if let Delivery::Failed(reason) = &delivery {
            warn!(recipient = %recipient, notice = %notice, reason = %reason, "Notification not delivered");
        }
        delivery
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
