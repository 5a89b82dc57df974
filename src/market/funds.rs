//! Cash funds ledger for payment settlement
//!
//! The engine settles every payment against these in-market cash
//! accounts. Resolving real payment capability (bank rails, on-chain
//! value, whatever the deployment uses) happens outside the core; a
//! deposit here is the record that it succeeded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Funds-related errors
#[derive(Error, Debug)]
pub enum FundsError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u128, need: u128 },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Funds overflow: operation rejected")]
    FundsOverflow,
}

/// Cash account table, one balance per party
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FundsLedger {
    accounts: HashMap<String, u128>,
}

impl FundsLedger {
    /// Create an empty funds ledger
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Get the cash balance of an account
    pub fn balance_of(&self, account: &str) -> u128 {
        *self.accounts.get(account).unwrap_or(&0)
    }

    /// Credit an account with externally settled funds
    pub fn deposit(&mut self, account: &str, amount: u128) -> Result<(), FundsError> {
        if amount == 0 {
            return Err(FundsError::InvalidAmount);
        }

        let new_balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(FundsError::FundsOverflow)?;
        self.accounts.insert(account.to_string(), new_balance);

        log::debug!("Funds: deposited {} to {}", amount, account);
        Ok(())
    }

    /// Move funds between accounts as part of a market operation
    pub(crate) fn settle(&mut self, from: &str, to: &str, amount: u128) -> Result<(), FundsError> {
        if amount == 0 {
            return Err(FundsError::InvalidAmount);
        }

        let have = self.balance_of(from);
        if have < amount {
            return Err(FundsError::InsufficientFunds { have, need: amount });
        }

        if from == to {
            return Ok(());
        }

        let new_to = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(FundsError::FundsOverflow)?;

        self.accounts.insert(from.to_string(), have - amount);
        self.accounts.insert(to.to_string(), new_to);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_balance() {
        let mut funds = FundsLedger::new();

        funds.deposit("alice", 500).unwrap();
        funds.deposit("alice", 250).unwrap();

        assert_eq!(funds.balance_of("alice"), 750);
        assert_eq!(funds.balance_of("bob"), 0);
    }

    #[test]
    fn test_deposit_zero_rejected() {
        let mut funds = FundsLedger::new();

        let result = funds.deposit("alice", 0);
        assert!(matches!(result, Err(FundsError::InvalidAmount)));
    }

    #[test]
    fn test_settle() {
        let mut funds = FundsLedger::new();

        funds.deposit("alice", 500).unwrap();
        funds.settle("alice", "bob", 200).unwrap();

        assert_eq!(funds.balance_of("alice"), 300);
        assert_eq!(funds.balance_of("bob"), 200);
    }

    #[test]
    fn test_settle_insufficient_funds() {
        let mut funds = FundsLedger::new();

        funds.deposit("alice", 100).unwrap();
        let result = funds.settle("alice", "bob", 101);

        assert!(matches!(
            result,
            Err(FundsError::InsufficientFunds { have: 100, need: 101 })
        ));
        assert_eq!(funds.balance_of("alice"), 100);
        assert_eq!(funds.balance_of("bob"), 0);
    }

    #[test]
    fn test_settle_to_self_is_noop() {
        let mut funds = FundsLedger::new();

        funds.deposit("alice", 100).unwrap();
        funds.settle("alice", "alice", 60).unwrap();

        assert_eq!(funds.balance_of("alice"), 100);
    }

    #[test]
    fn test_deposit_overflow_rejected() {
        let mut funds = FundsLedger::new();

        funds.deposit("alice", u128::MAX).unwrap();
        let result = funds.deposit("alice", 1);

        assert!(matches!(result, Err(FundsError::FundsOverflow)));
        assert_eq!(funds.balance_of("alice"), u128::MAX);
    }
}
