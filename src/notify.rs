//! Best-effort notifications (e.g. a DM telling a user they received SC).
//!
//! Delivery never affects the ledger operation it is attached to: the
//! outcome is returned to the caller and failures are logged.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::info;
use uuid::Uuid;

use crate::types::UserId;

/// Something worth telling a user about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    TransferReceived { from: UserId, amount: Decimal },
    PaymentRequested { request_id: Uuid, requester: UserId, amount: Decimal },
    RequestFulfilled { request_id: Uuid, payer: UserId, amount: Decimal },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TransferReceived { from, amount } => {
                write!(f, "You received {amount} SC from {from}")
            }
            Notice::PaymentRequested { requester, amount, .. } => {
                write!(f, "{requester} is requesting {amount} SC from you")
            }
            Notice::RequestFulfilled { payer, amount, .. } => {
                write!(f, "{payer} paid your request of {amount} SC")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Delivered,
    Failed(String),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Outbound message channel provided by the front end.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &UserId, notice: &Notice) -> Delivery;
}

/// Writes notices to the log. Default when no front end is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &UserId, notice: &Notice) -> Delivery {
        info!(recipient = %recipient, notice = %notice, "Notification");
        Delivery::Delivered
    }
}
