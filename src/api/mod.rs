//! REST API module
//!
//! Provides HTTP REST API for programmatic access to the market. The
//! outer system resolves caller identity and real payment settlement;
//! this layer proxies requests to the marketplace engine, persists the
//! committed state, and broadcasts events.
//!
//! # Endpoints
//!
//! ## Businesses
//! - `POST /api/businesses` - Register a business
//! - `GET /api/businesses` - List businesses
//! - `GET /api/businesses/:ledger_id` - Business details
//!
//! ## Market
//! - `POST /api/market/primary` - Buy units from the business
//! - `POST /api/market/listings` - List units for sale
//! - `GET /api/market/listings/:ledger_id` - Listings for a ledger
//! - `POST /api/market/listings/:ledger_id/:index/buy` - Buy out a listing
//! - `POST /api/market/listings/:ledger_id/:index/cancel` - Cancel a listing
//! - `POST /api/market/buyback` - Business buyback
//! - `GET /api/trades` - Completed trades
//!
//! ## Ledgers
//! - `POST /api/ledgers/:ledger_id/mint` - Mint units (controller only)
//! - `POST /api/ledgers/:ledger_id/burn` - Burn units (controller only)
//! - `POST /api/ledgers/:ledger_id/reserve` - Set reserve account
//! - `GET /api/ledgers/:ledger_id/balances/:holder` - Unit balance
//! - `GET /api/ledgers/:ledger_id/history` - Ledger audit history
//!
//! ## Funds
//! - `POST /api/funds/deposit` - Credit a cash account
//! - `GET /api/funds/:account` - Cash balance
//!
//! ## WebSocket
//! - `GET /ws` - Real-time events (BusinessRegistered, ListingCreated,
//!   ListingFulfilled, BuybackCompleted, ...)

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::{MarketEvent, WsBroadcaster};
