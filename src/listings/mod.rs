//! Listing book
//!
//! Standing sell offers against a specific share ledger. A listing is
//! fulfillable at most once, in full; there is no partial fill and no
//! escrow at creation time, so the marketplace engine re-validates the
//! seller's balance when a listing is fulfilled.

pub mod book;

pub use book::{Listing, ListingBook, ListingError, ListingStatus};
