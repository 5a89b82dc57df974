//! Per-business share ledger
//!
//! Each registered business owns exactly one ledger: a fungible-unit
//! balance table with mint/burn, an internal transfer primitive, and a
//! designated reserve account for sweeping units without touching supply.
//!
//! # Example
//!
//! ```ignore
//! use bricks_market::ledger::ShareLedger;
//!
//! let mut ledger = ShareLedger::new("0xLEDGER".to_string(), "business_wallet".to_string());
//!
//! // Mint units to an early investor (controller only)
//! ledger.mint("business_wallet", "investor", 1_000).unwrap();
//!
//! // Check balance and supply
//! assert_eq!(ledger.balance_of("investor"), 1_000);
//! assert_eq!(ledger.total_supply(), 1_000);
//! ```

pub mod ledger;

pub use ledger::{LedgerError, LedgerEvent, LedgerEventKind, ShareLedger};
