//! Atomic market operations
//!
//! The `Market` aggregate is the sole writer of the registry, the
//! ledgers, the listing book, and the funds ledger. Every operation
//! validates completely before touching state, so a failure anywhere
//! leaves no partial effect. Callers that need cross-thread access wrap
//! the whole aggregate in a single lock (see the API layer), which
//! serializes writers and keeps reads on a consistent snapshot.

use crate::ledger::{LedgerError, LedgerEvent};
use crate::listings::{Listing, ListingBook, ListingError};
use crate::market::funds::{FundsError, FundsLedger};
use crate::registry::{Business, BusinessRegistry, RegistryError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Market-level errors, composing the subsystem errors
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),
    #[error("Funds error: {0}")]
    Funds(#[from] FundsError),
    #[error("Cost overflow: {amount} units at {price_per_unit} per unit")]
    CostOverflow { amount: u128, price_per_unit: u128 },
    #[error("No active listing on {ledger_id} for {amount} units at {price_per_unit}")]
    NoMatchingListing {
        ledger_id: String,
        amount: u128,
        price_per_unit: u128,
    },
}

/// What the business does with units it buys back
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetirementPolicy {
    /// Burn the repurchased units, shrinking total supply
    Burn,
    /// Sweep the repurchased units into the reserve account
    CollectToReserve,
}

/// Kind of completed market trade
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    /// Units acquired directly from the business (minted or reserve-held)
    PrimarySale,
    /// Units acquired from an existing holder via a listing
    ListingFulfillment,
    /// Units repurchased by the business
    Buyback,
}

/// Immutable record of a completed trade
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeRecord {
    pub kind: TradeKind,
    pub ledger_id: String,
    pub buyer: String,
    pub seller: String,
    pub amount: u128,
    pub price_per_unit: u128,
    pub total_paid: u128,
    pub timestamp: DateTime<Utc>,
}

/// The marketplace aggregate: registry, listings, funds, trade log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Market {
    registry: BusinessRegistry,
    listings: ListingBook,
    funds: FundsLedger,
    trades: Vec<TradeRecord>,
}

impl Market {
    /// Create an empty market
    pub fn new() -> Self {
        Self {
            registry: BusinessRegistry::new(),
            listings: ListingBook::new(),
            funds: FundsLedger::new(),
            trades: Vec::new(),
        }
    }

    fn checked_cost(amount: u128, price_per_unit: u128) -> Result<u128, MarketError> {
        amount
            .checked_mul(price_per_unit)
            .ok_or(MarketError::CostOverflow {
                amount,
                price_per_unit,
            })
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a business; the caller becomes the ledger controller
    ///
    /// Returns the new ledger id.
    pub fn register_business(
        &mut self,
        name: String,
        symbol: String,
        caller: &str,
    ) -> Result<String, MarketError> {
        Ok(self.registry.register(name, symbol, caller.to_string())?)
    }

    // =========================================================================
    // Primary sales
    // =========================================================================

    /// Buy units directly from the business
    ///
    /// If the ledger has a reserve account holding enough units, they
    /// are transferred out of the reserve; otherwise new units are
    /// minted to the buyer. Payment settles from the buyer to the
    /// business controller.
    pub fn buy_from_business(
        &mut self,
        ledger_id: &str,
        buyer: &str,
        amount: u128,
        price_per_unit: u128,
    ) -> Result<(), MarketError> {
        let ledger = self.registry.ledger(ledger_id)?;
        let controller = ledger.controller().to_string();

        if amount == 0 {
            return Err(LedgerError::InvalidAmount.into());
        }
        let cost = Self::checked_cost(amount, price_per_unit)?;
        if cost == 0 {
            return Err(FundsError::InvalidAmount.into());
        }

        let have = self.funds.balance_of(buyer);
        if have < cost {
            return Err(FundsError::InsufficientFunds { have, need: cost }.into());
        }
        if self.funds.balance_of(&controller).checked_add(cost).is_none() {
            return Err(FundsError::FundsOverflow.into());
        }

        // Source the units from the reserve when it holds enough,
        // otherwise mint fresh supply.
        let reserve_source = match ledger.reserve_account() {
            Some(reserve) if ledger.balance_of(reserve) >= amount => Some(reserve.to_string()),
            _ => None,
        };
        if let Some(reserve) = reserve_source {
            if reserve == buyer {
                return Err(LedgerError::SelfTransfer.into());
            }
            if ledger.balance_of(buyer).checked_add(amount).is_none() {
                return Err(LedgerError::BalanceOverflow.into());
            }

            self.funds.settle(buyer, &controller, cost)?;
            self.registry
                .ledger_mut(ledger_id)?
                .transfer(&reserve, buyer, amount)?;
        } else {
            if ledger.balance_of(buyer).checked_add(amount).is_none()
                || ledger.total_supply().checked_add(amount).is_none()
            {
                return Err(LedgerError::BalanceOverflow.into());
            }

            self.funds.settle(buyer, &controller, cost)?;
            self.registry
                .ledger_mut(ledger_id)?
                .mint(&controller, buyer, amount)?;
        }

        self.record_trade(
            TradeKind::PrimarySale,
            ledger_id,
            buyer,
            &controller,
            amount,
            price_per_unit,
            cost,
        );
        log::info!(
            "Primary sale on {}: {} bought {} units at {} each",
            ledger_id,
            buyer,
            amount,
            price_per_unit
        );
        Ok(())
    }

    // =========================================================================
    // Secondary market
    // =========================================================================

    /// List units for sale on the secondary market
    ///
    /// The seller must currently hold the listed amount; it is not
    /// escrowed, so fulfillment re-validates the balance.
    pub fn list_shares_for_sale(
        &mut self,
        ledger_id: &str,
        seller: &str,
        amount: u128,
        price_per_unit: u128,
    ) -> Result<usize, MarketError> {
        let ledger = self.registry.ledger(ledger_id)?;

        let have = ledger.balance_of(seller);
        if amount > 0 && have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount }.into());
        }

        let index = self.listings.create(
            ledger_id.to_string(),
            seller.to_string(),
            amount,
            price_per_unit,
        )?;

        log::info!(
            "Listing {} on {}: {} offers {} units at {} each",
            index,
            ledger_id,
            seller,
            amount,
            price_per_unit
        );
        Ok(index)
    }

    /// Cancel a listing (seller only)
    pub fn cancel_listing(
        &mut self,
        ledger_id: &str,
        index: usize,
        caller: &str,
    ) -> Result<(), MarketError> {
        if self.listings.get(index)?.ledger_id != ledger_id {
            return Err(ListingError::NotFound(index).into());
        }
        self.listings.cancel(index, caller)?;
        log::info!("Listing {} on {} cancelled by {}", index, ledger_id, caller);
        Ok(())
    }

    /// Buy a listed amount of units from an existing holder
    ///
    /// Re-validates the listing and the seller's current balance, then
    /// settles payment, transfers the units, and fulfills the listing
    /// as one step. A second purchase of the same listing always fails.
    pub fn buy_from_investor(
        &mut self,
        ledger_id: &str,
        listing_index: usize,
        buyer: &str,
    ) -> Result<(), MarketError> {
        let listing = self.listings.get(listing_index)?;
        if listing.ledger_id != ledger_id {
            return Err(ListingError::NotFound(listing_index).into());
        }
        if !listing.is_active() {
            return Err(ListingError::NotActive(listing_index).into());
        }

        let seller = listing.seller.clone();
        let amount = listing.amount;
        let price_per_unit = listing.price_per_unit;

        if buyer == seller {
            return Err(LedgerError::SelfTransfer.into());
        }

        let ledger = self.registry.ledger(ledger_id)?;
        let seller_units = ledger.balance_of(&seller);
        if seller_units < amount {
            return Err(LedgerError::InsufficientBalance {
                have: seller_units,
                need: amount,
            }
            .into());
        }
        if ledger.balance_of(buyer).checked_add(amount).is_none() {
            return Err(LedgerError::BalanceOverflow.into());
        }

        let cost = Self::checked_cost(amount, price_per_unit)?;
        let have = self.funds.balance_of(buyer);
        if have < cost {
            return Err(FundsError::InsufficientFunds { have, need: cost }.into());
        }
        if self.funds.balance_of(&seller).checked_add(cost).is_none() {
            return Err(FundsError::FundsOverflow.into());
        }

        self.funds.settle(buyer, &seller, cost)?;
        self.registry
            .ledger_mut(ledger_id)?
            .transfer(&seller, buyer, amount)?;
        self.listings.fulfill(listing_index)?;

        self.record_trade(
            TradeKind::ListingFulfillment,
            ledger_id,
            buyer,
            &seller,
            amount,
            price_per_unit,
            cost,
        );
        log::info!(
            "Listing {} on {} fulfilled: {} bought {} units from {}",
            listing_index,
            ledger_id,
            buyer,
            amount,
            seller
        );
        Ok(())
    }

    // =========================================================================
    // Buybacks
    // =========================================================================

    /// Repurchase units from a holder and retire them
    ///
    /// Controller only. Fulfills the oldest active listing on the
    /// ledger matching the requested amount and price, with the
    /// business as buyer; the units then burn or sweep to the reserve
    /// per the chosen policy.
    pub fn business_buyback(
        &mut self,
        ledger_id: &str,
        caller: &str,
        amount: u128,
        price_per_unit: u128,
        policy: RetirementPolicy,
    ) -> Result<(), MarketError> {
        let ledger = self.registry.ledger(ledger_id)?;
        if !ledger.is_controller(caller) {
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
            }
            .into());
        }

        if amount == 0 {
            return Err(LedgerError::InvalidAmount.into());
        }
        let cost = Self::checked_cost(amount, price_per_unit)?;
        if cost == 0 {
            return Err(FundsError::InvalidAmount.into());
        }

        let (index, seller) = self
            .listings
            .active_for_ledger(ledger_id)
            .into_iter()
            .find(|(_, l)| l.amount == amount && l.price_per_unit == price_per_unit)
            .map(|(i, l)| (i, l.seller.clone()))
            .ok_or_else(|| MarketError::NoMatchingListing {
                ledger_id: ledger_id.to_string(),
                amount,
                price_per_unit,
            })?;

        let seller_units = ledger.balance_of(&seller);
        if seller_units < amount {
            return Err(LedgerError::InsufficientBalance {
                have: seller_units,
                need: amount,
            }
            .into());
        }

        match policy {
            RetirementPolicy::Burn => {}
            RetirementPolicy::CollectToReserve => {
                let reserve = ledger
                    .reserve_account()
                    .ok_or(LedgerError::NoReserveAccount)?;
                if reserve == seller {
                    return Err(LedgerError::SelfTransfer.into());
                }
                if ledger.balance_of(reserve).checked_add(amount).is_none() {
                    return Err(LedgerError::BalanceOverflow.into());
                }
            }
        }

        let have = self.funds.balance_of(caller);
        if have < cost {
            return Err(FundsError::InsufficientFunds { have, need: cost }.into());
        }
        if seller != caller && self.funds.balance_of(&seller).checked_add(cost).is_none() {
            return Err(FundsError::FundsOverflow.into());
        }

        self.funds.settle(caller, &seller, cost)?;
        let ledger = self.registry.ledger_mut(ledger_id)?;
        match policy {
            RetirementPolicy::Burn => ledger.burn(caller, &seller, amount)?,
            RetirementPolicy::CollectToReserve => {
                ledger.collect_to_reserve(caller, &seller, amount)?
            }
        }
        self.listings.fulfill(index)?;

        self.record_trade(
            TradeKind::Buyback,
            ledger_id,
            caller,
            &seller,
            amount,
            price_per_unit,
            cost,
        );
        log::info!(
            "Buyback on {}: {} repurchased {} units from {} ({:?})",
            ledger_id,
            caller,
            amount,
            seller,
            policy
        );
        Ok(())
    }

    // =========================================================================
    // Administrative ledger operations
    // =========================================================================

    /// Mint units on a ledger (controller only)
    pub fn mint(
        &mut self,
        ledger_id: &str,
        caller: &str,
        holder: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        Ok(self
            .registry
            .ledger_mut(ledger_id)?
            .mint(caller, holder, amount)?)
    }

    /// Burn units on a ledger (controller only)
    pub fn burn(
        &mut self,
        ledger_id: &str,
        caller: &str,
        holder: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        Ok(self
            .registry
            .ledger_mut(ledger_id)?
            .burn(caller, holder, amount)?)
    }

    /// Set a ledger's reserve account (controller only)
    pub fn set_reserve_account(
        &mut self,
        ledger_id: &str,
        caller: &str,
        account: &str,
    ) -> Result<(), MarketError> {
        Ok(self
            .registry
            .ledger_mut(ledger_id)?
            .set_reserve_account(caller, account)?)
    }

    /// Sweep units from a holder to the reserve (controller only)
    pub fn collect_to_reserve(
        &mut self,
        ledger_id: &str,
        caller: &str,
        from: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        Ok(self
            .registry
            .ledger_mut(ledger_id)?
            .collect_to_reserve(caller, from, amount)?)
    }

    /// Credit a party's cash account
    pub fn deposit_funds(&mut self, account: &str, amount: u128) -> Result<(), MarketError> {
        Ok(self.funds.deposit(account, amount)?)
    }

    // =========================================================================
    // View Functions
    // =========================================================================

    /// Get a holder's unit balance on a ledger
    pub fn balance_of(&self, ledger_id: &str, holder: &str) -> Result<u128, MarketError> {
        Ok(self.registry.ledger(ledger_id)?.balance_of(holder))
    }

    /// Get a ledger's total supply
    pub fn total_supply(&self, ledger_id: &str) -> Result<u128, MarketError> {
        Ok(self.registry.ledger(ledger_id)?.total_supply())
    }

    /// Look up a business by ledger id
    pub fn business(&self, ledger_id: &str) -> Result<&Business, MarketError> {
        Ok(self.registry.lookup(ledger_id)?)
    }

    /// List all registered businesses
    pub fn businesses(&self) -> Vec<&Business> {
        self.registry.businesses()
    }

    /// Get a listing on a ledger by index
    pub fn listing(&self, ledger_id: &str, index: usize) -> Result<&Listing, MarketError> {
        let listing = self.listings.get(index)?;
        if listing.ledger_id != ledger_id {
            return Err(ListingError::NotFound(index).into());
        }
        Ok(listing)
    }

    /// All listings for a ledger, with their indices
    pub fn listings_for_ledger(&self, ledger_id: &str) -> Vec<(usize, &Listing)> {
        self.listings.listings_for_ledger(ledger_id)
    }

    /// Get a party's cash balance
    pub fn funds_of(&self, account: &str) -> u128 {
        self.funds.balance_of(account)
    }

    /// The append-only trade log
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// A ledger's append-only audit history
    pub fn ledger_history(&self, ledger_id: &str) -> Result<&[LedgerEvent], MarketError> {
        Ok(self.registry.ledger(ledger_id)?.history())
    }

    #[allow(clippy::too_many_arguments)]
    fn record_trade(
        &mut self,
        kind: TradeKind,
        ledger_id: &str,
        buyer: &str,
        seller: &str,
        amount: u128,
        price_per_unit: u128,
        total_paid: u128,
    ) {
        self.trades.push(TradeRecord {
            kind,
            ledger_id: ledger_id.to_string(),
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            amount,
            price_per_unit,
            total_paid,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::ListingStatus;

    const OWNER: &str = "business_wallet";

    fn market_with_business() -> (Market, String) {
        let mut market = Market::new();
        let ledger_id = market
            .register_business("Corner Bakery".to_string(), "BRK".to_string(), OWNER)
            .unwrap();
        (market, ledger_id)
    }

    fn assert_conservation(market: &Market, ledger_id: &str) {
        let ledger = market.registry.ledger(ledger_id).unwrap();
        let sum: u128 = ledger.holders().iter().map(|(_, &b)| b).sum();
        assert_eq!(sum, ledger.total_supply());
    }

    // Scenario A: register, mint, check balance and supply
    #[test]
    fn test_register_and_mint() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();

        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 1000);
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 1000);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let (mut market, _) = market_with_business();

        let result =
            market.register_business("Corner Bakery".to_string(), "BRK".to_string(), "other");
        assert!(matches!(
            result,
            Err(MarketError::Registry(RegistryError::DuplicateRegistration { .. }))
        ));
    }

    #[test]
    fn test_primary_sale_mints_to_buyer() {
        let (mut market, ledger_id) = market_with_business();

        market.deposit_funds("investor", 1000).unwrap();
        market.buy_from_business(&ledger_id, "investor", 100, 5).unwrap();

        assert_eq!(market.balance_of(&ledger_id, "investor").unwrap(), 100);
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 100);
        assert_eq!(market.funds_of("investor"), 500);
        assert_eq!(market.funds_of(OWNER), 500);
        assert_eq!(market.trades().len(), 1);
        assert_eq!(market.trades()[0].kind, TradeKind::PrimarySale);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_primary_sale_from_reserve() {
        let (mut market, ledger_id) = market_with_business();

        market.set_reserve_account(&ledger_id, OWNER, "reserve").unwrap();
        market.mint(&ledger_id, OWNER, "reserve", 500).unwrap();
        market.deposit_funds("investor", 1000).unwrap();

        market.buy_from_business(&ledger_id, "investor", 100, 5).unwrap();

        // Supply unchanged: units came out of the reserve
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 500);
        assert_eq!(market.balance_of(&ledger_id, "reserve").unwrap(), 400);
        assert_eq!(market.balance_of(&ledger_id, "investor").unwrap(), 100);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_primary_sale_insufficient_funds() {
        let (mut market, ledger_id) = market_with_business();

        market.deposit_funds("investor", 499).unwrap();
        let result = market.buy_from_business(&ledger_id, "investor", 100, 5);

        assert!(matches!(
            result,
            Err(MarketError::Funds(FundsError::InsufficientFunds { have: 499, need: 500 }))
        ));
        assert_eq!(market.balance_of(&ledger_id, "investor").unwrap(), 0);
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 0);
        assert_eq!(market.funds_of("investor"), 499);
    }

    #[test]
    fn test_primary_sale_unknown_ledger() {
        let mut market = Market::new();

        let result = market.buy_from_business("0xNONE", "investor", 10, 1);
        assert!(matches!(
            result,
            Err(MarketError::Registry(RegistryError::NotFound(_)))
        ));
    }

    // Scenario B: list 200 at 5, another holder buys
    #[test]
    fn test_secondary_sale() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_k", 2000).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        market.buy_from_investor(&ledger_id, index, "holder_k").unwrap();

        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 800);
        assert_eq!(market.balance_of(&ledger_id, "holder_k").unwrap(), 200);
        assert_eq!(
            market.listing(&ledger_id, index).unwrap().status,
            ListingStatus::Fulfilled
        );
        assert_eq!(market.funds_of("holder_h"), 1000);
        assert_eq!(market.funds_of("holder_k"), 1000);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_list_more_than_held_rejected() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 100).unwrap();
        let result = market.list_shares_for_sale(&ledger_id, "holder_h", 101, 5);

        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
        assert!(market.listings_for_ledger(&ledger_id).is_empty());
    }

    // Idempotence: fulfilling the same listing twice
    #[test]
    fn test_fulfill_twice_rejected() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_k", 10_000).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        market.buy_from_investor(&ledger_id, index, "holder_k").unwrap();

        let after_first_h = market.balance_of(&ledger_id, "holder_h").unwrap();
        let after_first_k = market.balance_of(&ledger_id, "holder_k").unwrap();
        let after_first_funds_k = market.funds_of("holder_k");

        let result = market.buy_from_investor(&ledger_id, index, "holder_k");

        assert!(matches!(
            result,
            Err(MarketError::Listing(ListingError::NotActive(_)))
        ));
        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), after_first_h);
        assert_eq!(market.balance_of(&ledger_id, "holder_k").unwrap(), after_first_k);
        assert_eq!(market.funds_of("holder_k"), after_first_funds_k);
    }

    // Scenario C: seller's balance drops below the listed amount
    #[test]
    fn test_stale_listing_fails_without_effect() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 200).unwrap();
        market.deposit_funds("holder_k", 10_000).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        // Units leave the seller after listing creation
        market.burn(&ledger_id, OWNER, "holder_h", 150).unwrap();

        let result = market.buy_from_investor(&ledger_id, index, "holder_k");

        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::InsufficientBalance { have: 50, need: 200 }))
        ));
        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 50);
        assert_eq!(market.balance_of(&ledger_id, "holder_k").unwrap(), 0);
        assert_eq!(market.funds_of("holder_k"), 10_000);
        // The listing stays active; the buyer may retry after the seller tops up
        assert!(market.listing(&ledger_id, index).unwrap().is_active());
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_buy_from_investor_insufficient_funds() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_k", 999).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        let result = market.buy_from_investor(&ledger_id, index, "holder_k");

        assert!(matches!(
            result,
            Err(MarketError::Funds(FundsError::InsufficientFunds { have: 999, need: 1000 }))
        ));
        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 1000);
        assert!(market.listing(&ledger_id, index).unwrap().is_active());
    }

    #[test]
    fn test_buy_own_listing_rejected() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_h", 10_000).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        let result = market.buy_from_investor(&ledger_id, index, "holder_h");

        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::SelfTransfer))
        ));
        assert!(market.listing(&ledger_id, index).unwrap().is_active());
    }

    #[test]
    fn test_buy_listing_wrong_ledger() {
        let (mut market, ledger_id) = market_with_business();
        let other_id = market
            .register_business("Other Shop".to_string(), "OTH".to_string(), "other_owner")
            .unwrap();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_k", 10_000).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        let result = market.buy_from_investor(&other_id, index, "holder_k");

        assert!(matches!(
            result,
            Err(MarketError::Listing(ListingError::NotFound(_)))
        ));
    }

    // Scenario D: buyback with burn retirement
    #[test]
    fn test_buyback_burn() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 500).unwrap();
        market.deposit_funds(OWNER, 1000).unwrap();
        market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 3)
            .unwrap();

        market
            .business_buyback(&ledger_id, OWNER, 100, 3, RetirementPolicy::Burn)
            .unwrap();

        assert_eq!(market.total_supply(&ledger_id).unwrap(), 400);
        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 400);
        assert_eq!(market.funds_of("holder_h"), 300);
        assert_eq!(market.funds_of(OWNER), 700);
        assert_eq!(market.trades().last().unwrap().kind, TradeKind::Buyback);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_buyback_collect_to_reserve() {
        let (mut market, ledger_id) = market_with_business();

        market.set_reserve_account(&ledger_id, OWNER, "reserve").unwrap();
        market.mint(&ledger_id, OWNER, "holder_h", 500).unwrap();
        market.deposit_funds(OWNER, 1000).unwrap();
        market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 3)
            .unwrap();

        market
            .business_buyback(&ledger_id, OWNER, 100, 3, RetirementPolicy::CollectToReserve)
            .unwrap();

        // Supply intact: units moved to the reserve instead of burning
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 500);
        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 400);
        assert_eq!(market.balance_of(&ledger_id, "reserve").unwrap(), 100);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_buyback_unauthorized() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 500).unwrap();
        market.deposit_funds("intruder", 1000).unwrap();
        market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 3)
            .unwrap();

        let result =
            market.business_buyback(&ledger_id, "intruder", 100, 3, RetirementPolicy::Burn);

        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::Unauthorized { .. }))
        ));
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 500);
        assert_eq!(market.funds_of("intruder"), 1000);
    }

    #[test]
    fn test_buyback_without_matching_listing() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 500).unwrap();
        market.deposit_funds(OWNER, 1000).unwrap();
        market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 4)
            .unwrap();

        // Price does not match the standing listing
        let result = market.business_buyback(&ledger_id, OWNER, 100, 3, RetirementPolicy::Burn);

        assert!(matches!(result, Err(MarketError::NoMatchingListing { .. })));
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 500);
    }

    #[test]
    fn test_buyback_reserve_policy_requires_reserve_account() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 500).unwrap();
        market.deposit_funds(OWNER, 1000).unwrap();
        market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 3)
            .unwrap();

        let result = market.business_buyback(
            &ledger_id,
            OWNER,
            100,
            3,
            RetirementPolicy::CollectToReserve,
        );

        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::NoReserveAccount))
        ));
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 500);
        assert_eq!(market.funds_of(OWNER), 1000);
    }

    // Scenario E: two listings together exceed the holder's balance
    #[test]
    fn test_overlapping_listings_second_fails() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 250).unwrap();
        market.deposit_funds("holder_k", 100_000).unwrap();

        let first = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        let second = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();

        market.buy_from_investor(&ledger_id, first, "holder_k").unwrap();
        let result = market.buy_from_investor(&ledger_id, second, "holder_k");

        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::InsufficientBalance { have: 50, need: 200 }))
        ));
        assert_eq!(market.balance_of(&ledger_id, "holder_h").unwrap(), 50);
        assert_eq!(market.balance_of(&ledger_id, "holder_k").unwrap(), 200);
        assert_conservation(&market, &ledger_id);
    }

    #[test]
    fn test_cancel_listing_then_buy_rejected() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_k", 10_000).unwrap();

        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 200, 5)
            .unwrap();
        market.cancel_listing(&ledger_id, index, "holder_h").unwrap();

        let result = market.buy_from_investor(&ledger_id, index, "holder_k");
        assert!(matches!(
            result,
            Err(MarketError::Listing(ListingError::NotActive(_)))
        ));
    }

    #[test]
    fn test_cost_overflow_rejected() {
        let (mut market, ledger_id) = market_with_business();

        market.deposit_funds("investor", 1000).unwrap();
        let result = market.buy_from_business(&ledger_id, "investor", u128::MAX, 2);

        assert!(matches!(result, Err(MarketError::CostOverflow { .. })));
        assert_eq!(market.funds_of("investor"), 1000);
        assert_eq!(market.total_supply(&ledger_id).unwrap(), 0);
    }

    #[test]
    fn test_trade_log_accumulates() {
        let (mut market, ledger_id) = market_with_business();

        market.mint(&ledger_id, OWNER, "holder_h", 1000).unwrap();
        market.deposit_funds("holder_k", 10_000).unwrap();
        market.deposit_funds(OWNER, 10_000).unwrap();

        market.buy_from_business(&ledger_id, "holder_k", 50, 2).unwrap();
        let index = market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 3)
            .unwrap();
        market.buy_from_investor(&ledger_id, index, "holder_k").unwrap();
        market
            .list_shares_for_sale(&ledger_id, "holder_h", 100, 3)
            .unwrap();
        market
            .business_buyback(&ledger_id, OWNER, 100, 3, RetirementPolicy::Burn)
            .unwrap();

        let kinds: Vec<TradeKind> = market.trades().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TradeKind::PrimarySale,
                TradeKind::ListingFulfillment,
                TradeKind::Buyback
            ]
        );
        assert_conservation(&market, &ledger_id);
    }
}
