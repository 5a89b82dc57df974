//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket for real-time updates
        .route("/ws", get(ws_handler))
        // Businesses
        .route("/api/businesses", get(handlers::list_businesses))
        .route("/api/businesses", post(handlers::register_business))
        .route("/api/businesses/{ledger_id}", get(handlers::get_business))
        // Market operations
        .route("/api/market/primary", post(handlers::buy_from_business))
        .route("/api/market/listings", post(handlers::create_listing))
        .route(
            "/api/market/listings/{ledger_id}",
            get(handlers::get_listings),
        )
        .route(
            "/api/market/listings/{ledger_id}/{index}/buy",
            post(handlers::buy_from_investor),
        )
        .route(
            "/api/market/listings/{ledger_id}/{index}/cancel",
            post(handlers::cancel_listing),
        )
        .route("/api/market/buyback", post(handlers::business_buyback))
        .route("/api/trades", get(handlers::get_trades))
        // Ledger administration and views
        .route("/api/ledgers/{ledger_id}/mint", post(handlers::mint))
        .route("/api/ledgers/{ledger_id}/burn", post(handlers::burn))
        .route(
            "/api/ledgers/{ledger_id}/reserve",
            post(handlers::set_reserve_account),
        )
        .route(
            "/api/ledgers/{ledger_id}/balances/{holder}",
            get(handlers::get_balance),
        )
        .route(
            "/api/ledgers/{ledger_id}/history",
            get(handlers::get_history),
        )
        // Funds
        .route("/api/funds/deposit", post(handlers::deposit_funds))
        .route("/api/funds/{account}", get(handlers::get_funds))
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
