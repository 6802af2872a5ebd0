//! Pending payment requests ("alice asks bob for 20 SC").
//!
//! A request is single-use: fulfilling it runs the payment callback under
//! the request's lock and marks it consumed only when the payment succeeds.
//! Fulfilled and stale requests are dropped by `prune` once their time to
//! live has passed.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::storage::Slots;
use crate::types::{positive_cents, CasinoError, CasinoResult, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub id: Uuid,
    pub requester: UserId,
    pub payer: UserId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub consumed: bool,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl PaymentRequest {
    /// When the request last changed state.
    fn touched_at(&self) -> DateTime<Utc> {
        self.fulfilled_at.unwrap_or(self.created_at)
    }
}

#[derive(Default)]
pub struct RequestBook {
    requests: Slots<Uuid, PaymentRequest>,
}

impl RequestBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, requester: &UserId, payer: &UserId, amount: Decimal) -> CasinoResult<PaymentRequest> {
        let amount = positive_cents(amount)?;
        if requester == payer {
            return Err(CasinoError::SelfTransfer);
        }

        let request = PaymentRequest {
            id: Uuid::new_v4(),
            requester: requester.clone(),
            payer: payer.clone(),
            amount,
            created_at: Utc::now(),
            consumed: false,
            fulfilled_at: None,
        };
        self.requests.with_slot(&request.id, |slot| *slot = Some(request.clone()));

        info!(id = %request.id, requester = %requester, payer = %payer, amount = %amount, "Payment requested");
        Ok(request)
    }

    pub fn get(&self, id: &Uuid) -> CasinoResult<PaymentRequest> {
        self.requests
            .with_slot(id, |slot| slot.clone())
            .ok_or(CasinoError::UnknownRequest(*id))
    }

    /// Pay a request exactly once. Only the named payer may fulfil it.
    pub fn fulfill<R>(
        &self,
        id: &Uuid,
        actor: &UserId,
        pay: impl FnOnce(&PaymentRequest) -> CasinoResult<R>,
    ) -> CasinoResult<R> {
        self.requests.with_slot(id, |slot| {
            let request = slot.as_mut().ok_or(CasinoError::UnknownRequest(*id))?;
            if request.consumed {
                return Err(CasinoError::RequestAlreadyFulfilled(*id));
            }
            if &request.payer != actor {
                return Err(CasinoError::NotRequestPayer {
                    request: *id,
                    actor: actor.clone(),
                });
            }
            let out = pay(request)?;
            request.consumed = true;
            request.fulfilled_at = Some(Utc::now());
            Ok(out)
        })
    }

    /// Forget every request untouched for at least `ttl` as of `now`.
    pub fn prune(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let dropped = self.requests.retain(|request| now - request.touched_at() < ttl);
        if dropped > 0 {
            info!(dropped, "Pruned payment requests");
        }
        dropped
    }

    /// Requests currently held in memory.
    pub fn len(&self) -> usize {
        self.requests.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
