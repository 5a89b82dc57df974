//! Bricks Market CLI Application
//!
//! A command-line interface for operating the equity tokenization
//! market: registering businesses, minting and trading ownership
//! units, and serving the REST API.

use bricks_market::api::{create_router, ApiState, WsBroadcaster};
use bricks_market::cli::{self, AppState};
use bricks_market::market::{Market, RetirementPolicy};
use bricks_market::storage::{Storage, StorageConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "bricks")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "An equity tokenization marketplace in Rust", long_about = None)]
struct Cli {
    /// Data directory for market storage
    #[arg(short, long, default_value = ".bricks_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// How bought-back units are retired
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Retirement {
    /// Burn the units, shrinking supply
    Burn,
    /// Sweep the units into the reserve account
    Reserve,
}

impl From<Retirement> for RetirementPolicy {
    fn from(value: Retirement) -> Self {
        match value {
            Retirement::Burn => RetirementPolicy::Burn,
            Retirement::Reserve => RetirementPolicy::CollectToReserve,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new market
    Init,

    /// Register a business and create its ledger
    Register {
        /// Business display name
        #[arg(short, long)]
        name: String,

        /// Ticker symbol
        #[arg(short, long)]
        symbol: String,

        /// Controlling wallet
        #[arg(short, long)]
        wallet: String,
    },

    /// Mint units to a holder (controller only)
    Mint {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Controller wallet
        #[arg(short, long)]
        wallet: String,

        /// Receiving holder
        #[arg(long)]
        holder: String,

        /// Number of units
        #[arg(short, long)]
        amount: u128,
    },

    /// Burn units from a holder (controller only)
    Burn {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Controller wallet
        #[arg(short, long)]
        wallet: String,

        /// Holder to burn from
        #[arg(long)]
        holder: String,

        /// Number of units
        #[arg(short, long)]
        amount: u128,
    },

    /// Reserve account operations
    Reserve {
        #[command(subcommand)]
        action: ReserveCommands,
    },

    /// Credit a cash account
    Deposit {
        /// Account to credit
        #[arg(long)]
        account: String,

        /// Amount of cash
        #[arg(short, long)]
        amount: u128,
    },

    /// Buy units directly from a business (primary sale)
    Buy {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Buyer wallet
        #[arg(short, long)]
        buyer: String,

        /// Number of units
        #[arg(short, long)]
        amount: u128,

        /// Price per unit
        #[arg(short, long)]
        price: u128,
    },

    /// List units for sale on the secondary market
    ListShares {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Seller wallet
        #[arg(short, long)]
        seller: String,

        /// Number of units
        #[arg(short, long)]
        amount: u128,

        /// Price per unit
        #[arg(short, long)]
        price: u128,
    },

    /// Buy out a standing listing
    BuyListing {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Listing index
        #[arg(short, long)]
        index: usize,

        /// Buyer wallet
        #[arg(short, long)]
        buyer: String,
    },

    /// Cancel a standing listing (seller only)
    CancelListing {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Listing index
        #[arg(short, long)]
        index: usize,

        /// Seller wallet
        #[arg(short, long)]
        wallet: String,
    },

    /// Business buyback of issued units (controller only)
    Buyback {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Controller wallet
        #[arg(short, long)]
        wallet: String,

        /// Number of units
        #[arg(short, long)]
        amount: u128,

        /// Price per unit
        #[arg(short, long)]
        price: u128,

        /// Retirement policy for the repurchased units
        #[arg(long, value_enum, default_value = "burn")]
        policy: Retirement,
    },

    /// Show a holder's unit balance
    Balance {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Holder wallet
        #[arg(long)]
        holder: String,
    },

    /// Show a party's cash balance
    Funds {
        /// Account
        #[arg(long)]
        account: String,
    },

    /// List registered businesses
    Businesses,

    /// List listings for a ledger
    Listings {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,
    },

    /// Show a ledger's audit history
    History {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,
    },

    /// Show completed trades
    Trades,

    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[derive(Subcommand)]
enum ReserveCommands {
    /// Set the reserve account (controller only)
    Set {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Controller wallet
        #[arg(short, long)]
        wallet: String,

        /// Reserve account
        #[arg(long)]
        account: String,
    },

    /// Sweep units from a holder to the reserve (controller only)
    Collect {
        /// Ledger id
        #[arg(short, long)]
        ledger: String,

        /// Controller wallet
        #[arg(short, long)]
        wallet: String,

        /// Holder to sweep from
        #[arg(long)]
        from: String,

        /// Number of units
        #[arg(short, long)]
        amount: u128,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init command separately (doesn't need full state)
    if let Commands::Init = &cli.command {
        return cli::cmd_init(&cli.data_dir);
    }

    // Handle the API server with a tokio runtime
    if let Commands::Serve { port } = &cli.command {
        return run_server(*port, &cli.data_dir);
    }

    // Initialize application state
    let mut state = AppState::new(cli.data_dir.clone())?;

    // Process commands
    match cli.command {
        Commands::Init | Commands::Serve { .. } => unreachable!(),

        Commands::Register {
            name,
            symbol,
            wallet,
        } => {
            cli::cmd_register(&mut state, &name, &symbol, &wallet)?;
        }

        Commands::Mint {
            ledger,
            wallet,
            holder,
            amount,
        } => {
            cli::cmd_mint(&mut state, &ledger, &wallet, &holder, amount)?;
        }

        Commands::Burn {
            ledger,
            wallet,
            holder,
            amount,
        } => {
            cli::cmd_burn(&mut state, &ledger, &wallet, &holder, amount)?;
        }

        Commands::Reserve { action } => match action {
            ReserveCommands::Set {
                ledger,
                wallet,
                account,
            } => {
                cli::cmd_reserve_set(&mut state, &ledger, &wallet, &account)?;
            }
            ReserveCommands::Collect {
                ledger,
                wallet,
                from,
                amount,
            } => {
                cli::cmd_reserve_collect(&mut state, &ledger, &wallet, &from, amount)?;
            }
        },

        Commands::Deposit { account, amount } => {
            cli::cmd_deposit(&mut state, &account, amount)?;
        }

        Commands::Buy {
            ledger,
            buyer,
            amount,
            price,
        } => {
            cli::cmd_buy(&mut state, &ledger, &buyer, amount, price)?;
        }

        Commands::ListShares {
            ledger,
            seller,
            amount,
            price,
        } => {
            cli::cmd_list_shares(&mut state, &ledger, &seller, amount, price)?;
        }

        Commands::BuyListing {
            ledger,
            index,
            buyer,
        } => {
            cli::cmd_buy_listing(&mut state, &ledger, index, &buyer)?;
        }

        Commands::CancelListing {
            ledger,
            index,
            wallet,
        } => {
            cli::cmd_cancel_listing(&mut state, &ledger, index, &wallet)?;
        }

        Commands::Buyback {
            ledger,
            wallet,
            amount,
            price,
            policy,
        } => {
            cli::cmd_buyback(&mut state, &ledger, &wallet, amount, price, policy.into())?;
        }

        Commands::Balance { ledger, holder } => {
            cli::cmd_balance(&state, &ledger, &holder)?;
        }

        Commands::Funds { account } => {
            cli::cmd_funds(&state, &account)?;
        }

        Commands::Businesses => {
            cli::cmd_businesses(&state)?;
        }

        Commands::Listings { ledger } => {
            cli::cmd_listings(&state, &ledger)?;
        }

        Commands::History { ledger } => {
            cli::cmd_history(&state, &ledger)?;
        }

        Commands::Trades => {
            cli::cmd_trades(&state)?;
        }
    }

    Ok(())
}

fn run_server(port: u16, data_dir: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        // Initialize storage
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let storage = Arc::new(Storage::new(storage_config)?);

        // Load or create market
        let market = if storage.exists() {
            println!("📂 Loading existing market...");
            Arc::new(RwLock::new(storage.load()?))
        } else {
            println!("📂 Creating new market...");
            let market = Market::new();
            storage.save(&market)?;
            Arc::new(RwLock::new(market))
        };

        // Create WebSocket broadcaster
        let ws_broadcaster = Arc::new(WsBroadcaster::new());

        // Create API state
        let state = ApiState {
            market,
            storage,
            ws_broadcaster,
        };

        // Create router
        let app = create_router(state);

        // Start server
        let addr = format!("0.0.0.0:{}", port);
        println!("🚀 REST API server starting on http://localhost:{}", port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
