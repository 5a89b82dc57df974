//! Share ledger implementation
//!
//! Provides the per-business balance table with mint/burn and reserve
//! collection. Supply conservation holds after every operation:
//! the sum of all balances always equals the total supply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Ledger-related errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Unauthorized: {caller} is not the ledger controller")]
    Unauthorized { caller: String },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Balance overflow: operation rejected")]
    BalanceOverflow,
    #[error("No reserve account configured")]
    NoReserveAccount,
    #[error("Invalid transfer: cannot transfer to self")]
    SelfTransfer,
}

/// Kind of ledger mutation, recorded in the audit history
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    Mint,
    Burn,
    Transfer,
    ReserveCollection,
}

/// Immutable audit record appended on every ledger mutation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub kind: LedgerEventKind,
    /// Debited party (absent for mints)
    pub from: Option<String>,
    /// Credited party (absent for burns)
    pub to: Option<String>,
    pub amount: u128,
    /// Debited party's balance after the operation
    pub from_balance: Option<u128>,
    /// Credited party's balance after the operation
    pub to_balance: Option<u128>,
    /// Total supply after the operation
    pub total_supply: u128,
    pub timestamp: DateTime<Utc>,
}

/// A per-business ledger of fungible ownership units
///
/// Privileged operations (mint, burn, reserve changes) check the caller
/// against the stored controller identity. The transfer primitive is
/// crate-internal: external callers go through the marketplace engine,
/// which composes it into atomic payment-for-units exchanges.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareLedger {
    /// Unique ledger identifier
    pub id: String,
    /// Identity authorized to mint, burn, and sweep units
    controller: String,
    /// Balances: holder -> units
    balances: HashMap<String, u128>,
    /// Sum of all balances
    total_supply: u128,
    /// Designated reserve account, one active at a time
    reserve_account: Option<String>,
    /// Append-only audit history
    history: Vec<LedgerEvent>,
}

impl ShareLedger {
    /// Create an empty ledger with zero supply
    pub fn new(id: String, controller: String) -> Self {
        Self {
            id,
            controller,
            balances: HashMap::new(),
            total_supply: 0,
            reserve_account: None,
            history: Vec::new(),
        }
    }

    // =========================================================================
    // View Functions
    // =========================================================================

    /// Get balance of a holder
    pub fn balance_of(&self, holder: &str) -> u128 {
        *self.balances.get(holder).unwrap_or(&0)
    }

    /// Get total supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Get the controller identity
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Get the configured reserve account, if any
    pub fn reserve_account(&self) -> Option<&str> {
        self.reserve_account.as_deref()
    }

    /// Get all holders with non-zero balances
    pub fn holders(&self) -> Vec<(&String, &u128)> {
        self.balances.iter().filter(|(_, &b)| b > 0).collect()
    }

    /// Get holder count
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|&&b| b > 0).count()
    }

    /// Get the audit history
    pub fn history(&self) -> &[LedgerEvent] {
        &self.history
    }

    /// Check whether the caller is the controller
    pub fn is_controller(&self, caller: &str) -> bool {
        self.controller == caller
    }

    fn require_controller(&self, caller: &str) -> Result<(), LedgerError> {
        if !self.is_controller(caller) {
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Mutating Functions
    // =========================================================================

    /// Mint new units to a holder, increasing total supply
    ///
    /// Controller only. Overflow of the holder balance or the supply
    /// rejects the whole operation.
    pub fn mint(&mut self, caller: &str, holder: &str, amount: u128) -> Result<(), LedgerError> {
        self.require_controller(caller)?;

        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let new_balance = self
            .balance_of(holder)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        self.balances.insert(holder.to_string(), new_balance);
        self.total_supply = new_supply;

        self.history.push(LedgerEvent {
            kind: LedgerEventKind::Mint,
            from: None,
            to: Some(holder.to_string()),
            amount,
            from_balance: None,
            to_balance: Some(new_balance),
            total_supply: new_supply,
            timestamp: Utc::now(),
        });

        log::info!("Ledger {}: minted {} to {}", self.id, amount, holder);
        Ok(())
    }

    /// Burn units from a holder, decreasing total supply
    ///
    /// Controller only.
    pub fn burn(&mut self, caller: &str, holder: &str, amount: u128) -> Result<(), LedgerError> {
        self.require_controller(caller)?;

        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let have = self.balance_of(holder);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }

        let new_balance = have - amount;
        self.balances.insert(holder.to_string(), new_balance);
        self.total_supply -= amount;

        self.history.push(LedgerEvent {
            kind: LedgerEventKind::Burn,
            from: Some(holder.to_string()),
            to: None,
            amount,
            from_balance: Some(new_balance),
            to_balance: None,
            total_supply: self.total_supply,
            timestamp: Utc::now(),
        });

        log::info!("Ledger {}: burned {} from {}", self.id, amount, holder);
        Ok(())
    }

    /// Move units between holders without touching supply
    ///
    /// Internal primitive: only the marketplace engine invokes this, as
    /// part of a composite operation that has already settled payment.
    pub(crate) fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let (from_balance, to_balance) = self.move_units(from, to, amount)?;

        self.history.push(LedgerEvent {
            kind: LedgerEventKind::Transfer,
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            amount,
            from_balance: Some(from_balance),
            to_balance: Some(to_balance),
            total_supply: self.total_supply,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Sweep units from a holder into the reserve account
    ///
    /// Controller only. Supply is unchanged; fails if no reserve account
    /// has been configured.
    pub fn collect_to_reserve(
        &mut self,
        caller: &str,
        from: &str,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.require_controller(caller)?;

        let reserve = self
            .reserve_account
            .clone()
            .ok_or(LedgerError::NoReserveAccount)?;

        let (from_balance, to_balance) = self.move_units(from, &reserve, amount)?;

        self.history.push(LedgerEvent {
            kind: LedgerEventKind::ReserveCollection,
            from: Some(from.to_string()),
            to: Some(reserve),
            amount,
            from_balance: Some(from_balance),
            to_balance: Some(to_balance),
            total_supply: self.total_supply,
            timestamp: Utc::now(),
        });

        log::info!("Ledger {}: collected {} from {} to reserve", self.id, amount, from);
        Ok(())
    }

    /// Set the reserve account
    ///
    /// Controller only. Replaces any previously configured account.
    pub fn set_reserve_account(&mut self, caller: &str, account: &str) -> Result<(), LedgerError> {
        self.require_controller(caller)?;
        self.reserve_account = Some(account.to_string());
        Ok(())
    }

    /// Validate and apply a debit+credit pair, returning resulting balances
    fn move_units(
        &mut self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(u128, u128), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if from == to {
            return Err(LedgerError::SelfTransfer);
        }

        let have = self.balance_of(from);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }

        let new_to = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let new_from = have - amount;

        self.balances.insert(from.to_string(), new_from);
        self.balances.insert(to.to_string(), new_to);

        Ok((new_from, new_to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLLER: &str = "business_wallet";

    fn create_test_ledger() -> ShareLedger {
        ShareLedger::new("0xLEDGER".to_string(), CONTROLLER.to_string())
    }

    fn balance_sum(ledger: &ShareLedger) -> u128 {
        ledger.holders().iter().map(|(_, &b)| b).sum()
    }

    #[test]
    fn test_new_ledger_is_empty() {
        let ledger = create_test_ledger();
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(ledger.holder_count(), 0);
        assert_eq!(ledger.controller(), CONTROLLER);
        assert!(ledger.reserve_account().is_none());
    }

    #[test]
    fn test_mint() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "holder", 1000).unwrap();

        assert_eq!(ledger.balance_of("holder"), 1000);
        assert_eq!(ledger.total_supply(), 1000);
        assert_eq!(balance_sum(&ledger), ledger.total_supply());
        assert_eq!(ledger.history().len(), 1);
        assert_eq!(ledger.history()[0].kind, LedgerEventKind::Mint);
    }

    #[test]
    fn test_mint_unauthorized() {
        let mut ledger = create_test_ledger();

        let result = ledger.mint("intruder", "holder", 1000);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(ledger.total_supply(), 0);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn test_mint_zero_amount() {
        let mut ledger = create_test_ledger();

        let result = ledger.mint(CONTROLLER, "holder", 0);
        assert!(matches!(result, Err(LedgerError::InvalidAmount)));
    }

    #[test]
    fn test_mint_overflow_rejected() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "holder", u128::MAX).unwrap();
        let result = ledger.mint(CONTROLLER, "other", 1);

        assert!(matches!(result, Err(LedgerError::BalanceOverflow)));
        assert_eq!(ledger.total_supply(), u128::MAX);
        assert_eq!(ledger.balance_of("other"), 0);
    }

    #[test]
    fn test_burn() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "holder", 50).unwrap();
        ledger.burn(CONTROLLER, "holder", 20).unwrap();

        assert_eq!(ledger.balance_of("holder"), 30);
        assert_eq!(ledger.total_supply(), 30);
        assert_eq!(balance_sum(&ledger), ledger.total_supply());
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "holder", 10).unwrap();
        let result = ledger.burn(CONTROLLER, "holder", 11);

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { have: 10, need: 11 })
        ));
        assert_eq!(ledger.balance_of("holder"), 10);
        assert_eq!(ledger.total_supply(), 10);
    }

    #[test]
    fn test_burn_unauthorized() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "holder", 10).unwrap();
        let result = ledger.burn("holder", "holder", 5);

        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(ledger.balance_of("holder"), 10);
    }

    #[test]
    fn test_transfer() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "alice", 100).unwrap();
        ledger.transfer("alice", "bob", 40).unwrap();

        assert_eq!(ledger.balance_of("alice"), 60);
        assert_eq!(ledger.balance_of("bob"), 40);
        assert_eq!(ledger.total_supply(), 100);
        assert_eq!(balance_sum(&ledger), ledger.total_supply());
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "alice", 100).unwrap();
        let result = ledger.transfer("alice", "bob", 101);

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of("alice"), 100);
        assert_eq!(ledger.balance_of("bob"), 0);
    }

    #[test]
    fn test_transfer_to_self() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "alice", 100).unwrap();
        let result = ledger.transfer("alice", "alice", 10);

        assert!(matches!(result, Err(LedgerError::SelfTransfer)));
    }

    #[test]
    fn test_collect_to_reserve() {
        let mut ledger = create_test_ledger();

        ledger.set_reserve_account(CONTROLLER, "reserve").unwrap();
        ledger.mint(CONTROLLER, "holder", 10).unwrap();
        ledger.collect_to_reserve(CONTROLLER, "holder", 5).unwrap();

        assert_eq!(ledger.balance_of("reserve"), 5);
        assert_eq!(ledger.balance_of("holder"), 5);
        assert_eq!(ledger.total_supply(), 10);
    }

    #[test]
    fn test_collect_without_reserve_account() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "holder", 10).unwrap();
        let result = ledger.collect_to_reserve(CONTROLLER, "holder", 5);

        assert!(matches!(result, Err(LedgerError::NoReserveAccount)));
        assert_eq!(ledger.balance_of("holder"), 10);
    }

    #[test]
    fn test_set_reserve_account_replaces_previous() {
        let mut ledger = create_test_ledger();

        ledger.set_reserve_account(CONTROLLER, "reserve_a").unwrap();
        ledger.set_reserve_account(CONTROLLER, "reserve_b").unwrap();

        assert_eq!(ledger.reserve_account(), Some("reserve_b"));
    }

    #[test]
    fn test_set_reserve_account_unauthorized() {
        let mut ledger = create_test_ledger();

        let result = ledger.set_reserve_account("intruder", "reserve");
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert!(ledger.reserve_account().is_none());
    }

    #[test]
    fn test_conservation_across_operations() {
        let mut ledger = create_test_ledger();

        ledger.set_reserve_account(CONTROLLER, "reserve").unwrap();
        ledger.mint(CONTROLLER, "alice", 500).unwrap();
        ledger.mint(CONTROLLER, "bob", 300).unwrap();
        ledger.transfer("alice", "bob", 120).unwrap();
        ledger.burn(CONTROLLER, "bob", 20).unwrap();
        ledger.collect_to_reserve(CONTROLLER, "alice", 80).unwrap();

        assert_eq!(ledger.total_supply(), 780);
        assert_eq!(balance_sum(&ledger), ledger.total_supply());
    }

    #[test]
    fn test_history_is_append_only() {
        let mut ledger = create_test_ledger();

        ledger.mint(CONTROLLER, "alice", 100).unwrap();
        ledger.transfer("alice", "bob", 40).unwrap();
        ledger.burn(CONTROLLER, "bob", 10).unwrap();

        let kinds: Vec<LedgerEventKind> = ledger.history().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LedgerEventKind::Mint,
                LedgerEventKind::Transfer,
                LedgerEventKind::Burn
            ]
        );
        assert_eq!(ledger.history()[2].total_supply, 90);
    }
}
