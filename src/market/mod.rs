//! Marketplace engine
//!
//! Composes the business registry, the share ledgers, the listing book,
//! and a cash funds ledger into atomic market operations: primary sales,
//! secondary-listing fulfillment, and buybacks. Every operation either
//! applies all of its ledger and listing effects or none of them.
//!
//! # Example
//!
//! ```ignore
//! use bricks_market::market::Market;
//!
//! let mut market = Market::new();
//!
//! // Register a business; the caller becomes the ledger controller
//! let ledger_id = market
//!     .register_business("Corner Bakery".to_string(), "BRK".to_string(), "owner")
//!     .unwrap();
//!
//! // An investor funds their account and buys a primary issue
//! market.deposit_funds("investor", 10_000).unwrap();
//! market.buy_from_business(&ledger_id, "investor", 100, 5).unwrap();
//!
//! assert_eq!(market.balance_of(&ledger_id, "investor").unwrap(), 100);
//! ```

pub mod engine;
pub mod funds;

pub use engine::{Market, MarketError, RetirementPolicy, TradeKind, TradeRecord};
pub use funds::{FundsError, FundsLedger};
