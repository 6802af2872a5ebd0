//! SHIFTYCOIN — chat casino economy.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod cards;
pub mod clock;
pub mod game;
pub mod ledger;
pub mod loans;
pub mod notify;
pub mod engine;
pub mod storage;
pub mod dashboard;
