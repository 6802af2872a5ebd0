//! SC bookkeeping: balances, wagers and payment requests.

pub mod balance;
pub mod bets;
pub mod requests;

pub use balance::{BalanceEntry, BalanceLedger, TransferReceipt};
pub use bets::BetRegistry;
pub use requests::{PaymentRequest, RequestBook};
