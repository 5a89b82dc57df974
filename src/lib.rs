//! Bricks Market: an equity tokenization ledger and marketplace engine
//!
//! This crate lets a business tokenize a fraction of its equity, issue
//! tradeable ownership units to a community, and move those units
//! between the business, a reserve, and investors. It provides:
//! - Per-business share ledgers with mint/burn and supply conservation
//! - A business registry mapping each ledger to its controlling wallet
//! - A listing book of standing sell offers, fulfillable at most once
//! - A marketplace engine composing the above into atomic primary
//!   sales, secondary-listing fulfillment, and buybacks
//! - JSON persistence with rotating backups
//! - A REST API with WebSocket event broadcasting
//!
//! # Example
//!
//! ```rust
//! use bricks_market::market::Market;
//!
//! let mut market = Market::new();
//!
//! // Register a business; the caller becomes the ledger controller
//! let ledger_id = market
//!     .register_business("Corner Bakery".to_string(), "BRK".to_string(), "owner")
//!     .unwrap();
//!
//! // The business mints units to an early investor
//! market.mint(&ledger_id, "owner", "investor", 1_000).unwrap();
//!
//! // Another holder funds their account and buys via a listing
//! market.deposit_funds("buyer", 1_000).unwrap();
//! let index = market
//!     .list_shares_for_sale(&ledger_id, "investor", 200, 5)
//!     .unwrap();
//! market.buy_from_investor(&ledger_id, index, "buyer").unwrap();
//!
//! assert_eq!(market.balance_of(&ledger_id, "buyer").unwrap(), 200);
//! assert_eq!(market.total_supply(&ledger_id).unwrap(), 1_000);
//! ```

pub mod api;
pub mod cli;
pub mod ledger;
pub mod listings;
pub mod market;
pub mod registry;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState, MarketEvent, WsBroadcaster};
pub use ledger::{LedgerError, LedgerEvent, LedgerEventKind, ShareLedger};
pub use listings::{Listing, ListingBook, ListingError, ListingStatus};
pub use market::{FundsError, FundsLedger, Market, MarketError, RetirementPolicy, TradeKind, TradeRecord};
pub use registry::{Business, BusinessRegistry, RegistryError};
pub use storage::{Storage, StorageConfig, StorageError};
