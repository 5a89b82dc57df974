//! Listing book implementation
//!
//! Listings are kept in one append-only vector; the index returned at
//! creation is the listing's permanent identifier. Status transitions
//! are terminal: active -> fulfilled, or active -> cancelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Listing-related errors
#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Listing not found: {0}")]
    NotFound(usize),
    #[error("Listing {0} is not active")]
    NotActive(usize),
    #[error("Only the seller can cancel listing {index} (caller: {caller})")]
    NotSeller { index: usize, caller: String },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Invalid price: price per unit must be greater than 0")]
    InvalidPrice,
}

/// Lifecycle status of a listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Active,
    Fulfilled,
    Cancelled,
}

/// A standing offer to sell units at a fixed price
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Listing {
    /// Ledger the offered units live on
    pub ledger_id: String,
    /// Holder offering the units
    pub seller: String,
    /// Number of units offered (filled in full or not at all)
    pub amount: u128,
    /// Asking price per unit
    pub price_per_unit: u128,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Check whether the listing can still be fulfilled
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// Book of all listings across all ledgers
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListingBook {
    listings: Vec<Listing>,
}

impl ListingBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self {
            listings: Vec::new(),
        }
    }

    /// Append a new active listing, returning its index
    ///
    /// The seller's balance is not escrowed here; the engine validates
    /// it both at creation and again at fulfillment.
    pub fn create(
        &mut self,
        ledger_id: String,
        seller: String,
        amount: u128,
        price_per_unit: u128,
    ) -> Result<usize, ListingError> {
        if amount == 0 {
            return Err(ListingError::InvalidAmount);
        }
        if price_per_unit == 0 {
            return Err(ListingError::InvalidPrice);
        }

        self.listings.push(Listing {
            ledger_id,
            seller,
            amount,
            price_per_unit,
            status: ListingStatus::Active,
            created_at: Utc::now(),
        });

        Ok(self.listings.len() - 1)
    }

    /// Cancel an active listing (seller only)
    pub fn cancel(&mut self, index: usize, caller: &str) -> Result<(), ListingError> {
        let listing = self
            .listings
            .get_mut(index)
            .ok_or(ListingError::NotFound(index))?;

        if listing.seller != caller {
            return Err(ListingError::NotSeller {
                index,
                caller: caller.to_string(),
            });
        }
        if !listing.is_active() {
            return Err(ListingError::NotActive(index));
        }

        listing.status = ListingStatus::Cancelled;
        Ok(())
    }

    /// Mark an active listing as fulfilled
    ///
    /// A second call on the same index always fails, which is what
    /// prevents one listing from being spent twice.
    pub fn fulfill(&mut self, index: usize) -> Result<(), ListingError> {
        let listing = self
            .listings
            .get_mut(index)
            .ok_or(ListingError::NotFound(index))?;

        if !listing.is_active() {
            return Err(ListingError::NotActive(index));
        }

        listing.status = ListingStatus::Fulfilled;
        Ok(())
    }

    /// Get a listing by index
    pub fn get(&self, index: usize) -> Result<&Listing, ListingError> {
        self.listings.get(index).ok_or(ListingError::NotFound(index))
    }

    /// All listings for a ledger, with their indices
    pub fn listings_for_ledger(&self, ledger_id: &str) -> Vec<(usize, &Listing)> {
        self.listings
            .iter()
            .enumerate()
            .filter(|(_, l)| l.ledger_id == ledger_id)
            .collect()
    }

    /// Active listings for a ledger, with their indices
    pub fn active_for_ledger(&self, ledger_id: &str) -> Vec<(usize, &Listing)> {
        self.listings
            .iter()
            .enumerate()
            .filter(|(_, l)| l.ledger_id == ledger_id && l.is_active())
            .collect()
    }

    /// Total number of listings ever created
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Check if the book is empty
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
