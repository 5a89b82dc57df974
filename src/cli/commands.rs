//! CLI commands for the market
//!
//! Implements all command handlers for the CLI interface. Mutating
//! commands load the market state, apply one engine operation, and save
//! the state back.

use crate::market::{Market, RetirementPolicy, TradeKind};
use crate::storage::{Storage, StorageConfig};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub market: Market,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize application state
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };

        let storage = Storage::new(storage_config)?;

        // Load or create market
        let market = if storage.exists() {
            println!("📂 Loading existing market...");
            storage.load()?
        } else {
            println!("🆕 Creating new market...");
            let market = Market::new();
            storage.save(&market)?;
            market
        };

        Ok(Self {
            market,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.market)?;
        Ok(())
    }
}

/// Initialize a new market data directory
pub fn cmd_init(data_dir: &PathBuf) -> CliResult<()> {
    let storage_config = StorageConfig {
        data_dir: data_dir.clone(),
        ..Default::default()
    };

    let storage = Storage::new(storage_config)?;

    if storage.exists() {
        println!("⚠️  Market already exists at {:?}", data_dir);
        return Ok(());
    }

    storage.save(&Market::new())?;
    println!("✅ Market initialized at {:?}", data_dir);
    Ok(())
}

/// Register a new business
pub fn cmd_register(state: &mut AppState, name: &str, symbol: &str, wallet: &str) -> CliResult<()> {
    let ledger_id =
        state
            .market
            .register_business(name.to_string(), symbol.to_string(), wallet)?;
    state.save()?;

    println!("✅ Business registered: {} ({})", name, symbol);
    println!("   Ledger id: {}", ledger_id);
    println!("   Controller: {}", wallet);
    Ok(())
}

/// Mint units to a holder
pub fn cmd_mint(
    state: &mut AppState,
    ledger_id: &str,
    wallet: &str,
    holder: &str,
    amount: u128,
) -> CliResult<()> {
    state.market.mint(ledger_id, wallet, holder, amount)?;
    state.save()?;

    println!("✅ Minted {} units to {}", amount, holder);
    println!(
        "   Balance: {} | Supply: {}",
        state.market.balance_of(ledger_id, holder)?,
        state.market.total_supply(ledger_id)?
    );
    Ok(())
}

/// Burn units from a holder
pub fn cmd_burn(
    state: &mut AppState,
    ledger_id: &str,
    wallet: &str,
    holder: &str,
    amount: u128,
) -> CliResult<()> {
    state.market.burn(ledger_id, wallet, holder, amount)?;
    state.save()?;

    println!("🔥 Burned {} units from {}", amount, holder);
    println!(
        "   Balance: {} | Supply: {}",
        state.market.balance_of(ledger_id, holder)?,
        state.market.total_supply(ledger_id)?
    );
    Ok(())
}

/// Set a ledger's reserve account
pub fn cmd_reserve_set(
    state: &mut AppState,
    ledger_id: &str,
    wallet: &str,
    account: &str,
) -> CliResult<()> {
    state.market.set_reserve_account(ledger_id, wallet, account)?;
    state.save()?;

    println!("✅ Reserve account set to {}", account);
    Ok(())
}

/// Sweep units from a holder to the reserve
pub fn cmd_reserve_collect(
    state: &mut AppState,
    ledger_id: &str,
    wallet: &str,
    from: &str,
    amount: u128,
) -> CliResult<()> {
    state.market.collect_to_reserve(ledger_id, wallet, from, amount)?;
    state.save()?;

    println!("✅ Collected {} units from {} to reserve", amount, from);
    Ok(())
}

/// Credit a cash account
pub fn cmd_deposit(state: &mut AppState, account: &str, amount: u128) -> CliResult<()> {
    state.market.deposit_funds(account, amount)?;
    state.save()?;

    println!(
        "💰 Deposited {} — balance now {}",
        amount,
        state.market.funds_of(account)
    );
    Ok(())
}

/// Buy units directly from the business
pub fn cmd_buy(
    state: &mut AppState,
    ledger_id: &str,
    buyer: &str,
    amount: u128,
    price_per_unit: u128,
) -> CliResult<()> {
    state
        .market
        .buy_from_business(ledger_id, buyer, amount, price_per_unit)?;
    state.save()?;

    println!("✅ Bought {} units at {} each", amount, price_per_unit);
    println!(
        "   Balance: {} | Funds: {}",
        state.market.balance_of(ledger_id, buyer)?,
        state.market.funds_of(buyer)
    );
    Ok(())
}

/// List units for sale
pub fn cmd_list_shares(
    state: &mut AppState,
    ledger_id: &str,
    seller: &str,
    amount: u128,
    price_per_unit: u128,
) -> CliResult<()> {
    let index = state
        .market
        .list_shares_for_sale(ledger_id, seller, amount, price_per_unit)?;
    state.save()?;

    println!(
        "✅ Listed {} units at {} each (listing {})",
        amount, price_per_unit, index
    );
    Ok(())
}

/// Buy out a listing
pub fn cmd_buy_listing(
    state: &mut AppState,
    ledger_id: &str,
    index: usize,
    buyer: &str,
) -> CliResult<()> {
    state.market.buy_from_investor(ledger_id, index, buyer)?;
    state.save()?;

    println!("✅ Listing {} fulfilled", index);
    println!(
        "   Balance: {} | Funds: {}",
        state.market.balance_of(ledger_id, buyer)?,
        state.market.funds_of(buyer)
    );
    Ok(())
}

/// Cancel a listing
pub fn cmd_cancel_listing(
    state: &mut AppState,
    ledger_id: &str,
    index: usize,
    caller: &str,
) -> CliResult<()> {
    state.market.cancel_listing(ledger_id, index, caller)?;
    state.save()?;

    println!("✅ Listing {} cancelled", index);
    Ok(())
}

/// Business buyback
pub fn cmd_buyback(
    state: &mut AppState,
    ledger_id: &str,
    wallet: &str,
    amount: u128,
    price_per_unit: u128,
    policy: RetirementPolicy,
) -> CliResult<()> {
    state
        .market
        .business_buyback(ledger_id, wallet, amount, price_per_unit, policy)?;
    state.save()?;

    println!(
        "✅ Bought back {} units at {} each ({:?})",
        amount, price_per_unit, policy
    );
    println!("   Supply: {}", state.market.total_supply(ledger_id)?);
    Ok(())
}

/// Show a holder's unit balance
pub fn cmd_balance(state: &AppState, ledger_id: &str, holder: &str) -> CliResult<()> {
    let balance = state.market.balance_of(ledger_id, holder)?;
    let supply = state.market.total_supply(ledger_id)?;

    println!("💼 {}", holder);
    println!("   Balance: {} / {} total supply", balance, supply);
    Ok(())
}

/// Show a party's cash balance
pub fn cmd_funds(state: &AppState, account: &str) -> CliResult<()> {
    println!("💰 {}: {}", account, state.market.funds_of(account));
    Ok(())
}

/// List all registered businesses
pub fn cmd_businesses(state: &AppState) -> CliResult<()> {
    let businesses = state.market.businesses();

    if businesses.is_empty() {
        println!("No businesses registered yet");
        return Ok(());
    }

    println!("🏢 Businesses ({}):", businesses.len());
    for business in businesses {
        println!(
            "   {} ({}) — ledger {} — supply {} — {} holders",
            business.name,
            business.symbol,
            business.ledger.id,
            business.ledger.total_supply(),
            business.ledger.holder_count()
        );
    }
    Ok(())
}

/// List listings for a ledger
pub fn cmd_listings(state: &AppState, ledger_id: &str) -> CliResult<()> {
    let listings = state.market.listings_for_ledger(ledger_id);

    if listings.is_empty() {
        println!("No listings for {}", ledger_id);
        return Ok(());
    }

    println!("📋 Listings for {}:", ledger_id);
    for (index, listing) in listings {
        println!(
            "   #{} — {} units at {} each — {} — {:?}",
            index, listing.amount, listing.price_per_unit, listing.seller, listing.status
        );
    }
    Ok(())
}

/// Show a ledger's audit history
pub fn cmd_history(state: &AppState, ledger_id: &str) -> CliResult<()> {
    let events = state.market.ledger_history(ledger_id)?;

    if events.is_empty() {
        println!("No events on {}", ledger_id);
        return Ok(());
    }

    println!("📜 History for {}:", ledger_id);
    for event in events {
        println!(
            "   {:?} — {} units — from {} to {} — supply {}",
            event.kind,
            event.amount,
            event.from.as_deref().unwrap_or("-"),
            event.to.as_deref().unwrap_or("-"),
            event.total_supply
        );
    }
    Ok(())
}

/// Show completed trades
pub fn cmd_trades(state: &AppState) -> CliResult<()> {
    let trades = state.market.trades();

    if trades.is_empty() {
        println!("No trades yet");
        return Ok(());
    }

    println!("📈 Trades ({}):", trades.len());
    for trade in trades {
        let kind = match trade.kind {
            TradeKind::PrimarySale => "primary",
            TradeKind::ListingFulfillment => "secondary",
            TradeKind::Buyback => "buyback",
        };
        println!(
            "   {} — {} — {} units at {} — {} -> {} — paid {}",
            kind,
            trade.ledger_id,
            trade.amount,
            trade.price_per_unit,
            trade.buyer,
            trade.seller,
            trade.total_paid
        );
    }
    Ok(())
}
