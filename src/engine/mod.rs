//! Core engine — the casino service and round settlement.

pub mod casino;
pub mod settlement;

pub use casino::{Casino, CasinoBuilder, DeckSource, Notified};
pub use settlement::{settle, settlement_amount};
