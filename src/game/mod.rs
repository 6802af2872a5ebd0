//! Blackjack sessions, one per user.

pub mod session;

pub use session::{evaluate, GameSession, Outcome, Phase, SessionSnapshot};

use crate::cards::Deck;
use crate::storage::Slots;
use crate::types::{CasinoError, CasinoResult, UserId};

/// Live sessions keyed by user.
///
/// Each user's session sits behind its own lock. Transitions run on a copy
/// of the session and are committed only when the whole step (including
/// any ledger settlement done by the hook) succeeds.
#[derive(Default)]
pub struct SessionTable {
    slots: Slots<UserId, GameSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deal a new session unless an unfinished one exists.
    ///
    /// `on_deal` runs before the session is stored (it settles naturals).
    pub fn start(
        &self,
        user: &UserId,
        deck: impl FnOnce() -> Deck,
        on_deal: impl FnOnce(&mut GameSession) -> CasinoResult<()>,
    ) -> CasinoResult<SessionSnapshot> {
        self.slots.with_slot(user, |slot| {
            if slot.as_ref().is_some_and(|s| !s.is_finished()) {
                return Err(CasinoError::SessionAlreadyActive);
            }
            let mut session = GameSession::deal(deck())?;
            on_deal(&mut session)?;
            let snapshot = session.snapshot();
            *slot = Some(session);
            Ok(snapshot)
        })
    }

    /// Apply a transition to the user's unfinished session.
    pub fn advance(
        &self,
        user: &UserId,
        step: impl FnOnce(&mut GameSession) -> CasinoResult<()>,
    ) -> CasinoResult<SessionSnapshot> {
        self.slots.with_slot(user, |slot| {
            let current = slot
                .as_ref()
                .filter(|s| !s.is_finished())
                .ok_or(CasinoError::NoActiveSession)?;
            let mut next = current.clone();
            step(&mut next)?;
            let snapshot = next.snapshot();
            *slot = Some(next);
            Ok(snapshot)
        })
    }

    /// Snapshot of the user's latest session, finished or not.
    pub fn inspect(&self, user: &UserId) -> CasinoResult<SessionSnapshot> {
        self.slots.with_slot(user, |slot| {
            slot.as_ref()
                .map(GameSession::snapshot)
                .ok_or(CasinoError::NoActiveSession)
        })
    }

    /// Discard the user's session.
    pub fn stop(&self, user: &UserId) -> CasinoResult<()> {
        self.slots.with_slot(user, |slot| {
            slot.take().map(|_| ()).ok_or(CasinoError::NoActiveSession)
        })
    }

    /// Number of stored sessions (finished ones included until replaced).
    pub fn len(&self) -> usize {
        self.slots.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Users with an entry in the table, including idle ones.
    pub(crate) fn tracked_users(&self) -> usize {
        self.slots.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
