//! Registry of businesses and their share ledgers
//!
//! Handles registration and lookup. Each business gets a dedicated
//! zero-supply ledger at registration time, controlled by the wallet
//! that registered it.

use crate::ledger::ShareLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Registry-related errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Business not found: {0}")]
    NotFound(String),
    #[error("Duplicate registration: {name} ({symbol}) is already registered")]
    DuplicateRegistration { name: String, symbol: String },
    #[error("Invalid name: must be 1-50 characters")]
    InvalidName,
    #[error("Invalid symbol: must be 1-10 characters")]
    InvalidSymbol,
}

/// A registered business and its share ledger
///
/// Immutable after registration, except for ledger state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Business {
    /// Display name (e.g., "Corner Bakery")
    pub name: String,
    /// Ticker symbol (e.g., "BRK")
    pub symbol: String,
    /// Wallet authorized to act on the business's behalf
    pub controller: String,
    /// Timestamp of registration
    pub created_at: DateTime<Utc>,
    /// The business's dedicated share ledger
    pub ledger: ShareLedger,
}

/// Registry of all businesses, keyed by ledger id
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BusinessRegistry {
    businesses: HashMap<String, Business>,
    /// Registration counter for ledger id derivation
    nonce: u64,
}

impl BusinessRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            businesses: HashMap::new(),
            nonce: 0,
        }
    }

    /// Register a new business
    ///
    /// Creates a zero-supply ledger controlled by `controller` and
    /// returns the new ledger id. A name+symbol pair can only be
    /// registered once.
    pub fn register(
        &mut self,
        name: String,
        symbol: String,
        controller: String,
    ) -> Result<String, RegistryError> {
        if name.is_empty() || name.len() > 50 {
            return Err(RegistryError::InvalidName);
        }
        if symbol.is_empty() || symbol.len() > 10 {
            return Err(RegistryError::InvalidSymbol);
        }
        if self
            .businesses
            .values()
            .any(|b| b.name == name && b.symbol == symbol)
        {
            return Err(RegistryError::DuplicateRegistration { name, symbol });
        }

        let ledger_id = self.generate_ledger_id(&controller, &symbol);
        self.nonce += 1;

        let business = Business {
            name,
            symbol,
            controller: controller.clone(),
            created_at: Utc::now(),
            ledger: ShareLedger::new(ledger_id.clone(), controller),
        };

        log::info!(
            "Business registered: {} ({}) at {}",
            business.name,
            business.symbol,
            ledger_id
        );
        self.businesses.insert(ledger_id.clone(), business);

        Ok(ledger_id)
    }

    /// Derive a ledger id from controller, symbol, and registration nonce
    fn generate_ledger_id(&self, controller: &str, symbol: &str) -> String {
        let input = format!("{}:{}:{}", controller, symbol, self.nonce);
        let hash = Sha256::digest(input.as_bytes());
        format!("0x{}", &hex::encode(hash)[..40])
    }

    /// Look up a business by ledger id
    pub fn lookup(&self, ledger_id: &str) -> Result<&Business, RegistryError> {
        self.businesses
            .get(ledger_id)
            .ok_or_else(|| RegistryError::NotFound(ledger_id.to_string()))
    }

    /// Get a business's ledger
    pub fn ledger(&self, ledger_id: &str) -> Result<&ShareLedger, RegistryError> {
        Ok(&self.lookup(ledger_id)?.ledger)
    }

    /// Get mutable access to a business's ledger
    pub fn ledger_mut(&mut self, ledger_id: &str) -> Result<&mut ShareLedger, RegistryError> {
        self.businesses
            .get_mut(ledger_id)
            .map(|b| &mut b.ledger)
            .ok_or_else(|| RegistryError::NotFound(ledger_id.to_string()))
    }

    /// List all registered businesses
    pub fn businesses(&self) -> Vec<&Business> {
        self.businesses.values().collect()
    }

    /// Get business count
    pub fn count(&self) -> usize {
        self.businesses.len()
    }

    /// Check if a ledger id is registered
    pub fn exists(&self, ledger_id: &str) -> bool {
        self.businesses.contains_key(ledger_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = BusinessRegistry::new();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_register_business() {
        let mut registry = BusinessRegistry::new();

        let ledger_id = registry
            .register("Corner Bakery".to_string(), "BRK".to_string(), "owner".to_string())
            .unwrap();

        assert!(ledger_id.starts_with("0x"));
        assert_eq!(registry.count(), 1);

        let business = registry.lookup(&ledger_id).unwrap();
        assert_eq!(business.name, "Corner Bakery");
        assert_eq!(business.symbol, "BRK");
        assert_eq!(business.controller, "owner");
        assert_eq!(business.ledger.total_supply(), 0);
        assert_eq!(business.ledger.controller(), "owner");
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = BusinessRegistry::new();

        registry
            .register("Corner Bakery".to_string(), "BRK".to_string(), "owner".to_string())
            .unwrap();
        let result = registry.register(
            "Corner Bakery".to_string(),
            "BRK".to_string(),
            "other_owner".to_string(),
        );

        assert!(matches!(
            result,
            Err(RegistryError::DuplicateRegistration { .. })
        ));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_same_name_different_symbol_allowed() {
        let mut registry = BusinessRegistry::new();

        registry
            .register("Corner Bakery".to_string(), "BRK".to_string(), "owner".to_string())
            .unwrap();
        let result = registry.register(
            "Corner Bakery".to_string(),
            "BRK2".to_string(),
            "owner".to_string(),
        );

        assert!(result.is_ok());
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_register_validation() {
        let mut registry = BusinessRegistry::new();

        // Empty name
        assert!(matches!(
            registry.register("".to_string(), "BRK".to_string(), "o".to_string()),
            Err(RegistryError::InvalidName)
        ));

        // Symbol too long
        assert!(matches!(
            registry.register("Bakery".to_string(), "TOOLONGSYMBOL".to_string(), "o".to_string()),
            Err(RegistryError::InvalidSymbol)
        ));
    }

    #[test]
    fn test_lookup_unknown_ledger() {
        let registry = BusinessRegistry::new();

        let result = registry.lookup("0xNONEXISTENT");
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_ledger_ids_are_unique() {
        let mut registry = BusinessRegistry::new();

        let a = registry
            .register("Bakery".to_string(), "BRK".to_string(), "owner".to_string())
            .unwrap();
        let b = registry
            .register("Bakery Two".to_string(), "BRK".to_string(), "owner".to_string())
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_ledger_mut_reaches_ledger() {
        let mut registry = BusinessRegistry::new();

        let ledger_id = registry
            .register("Bakery".to_string(), "BRK".to_string(), "owner".to_string())
            .unwrap();

        registry
            .ledger_mut(&ledger_id)
            .unwrap()
            .mint("owner", "investor", 42)
            .unwrap();

        assert_eq!(registry.ledger(&ledger_id).unwrap().balance_of("investor"), 42);
    }
}
