//! REST API handlers for market operations
//!
//! Handlers resolve no identity themselves: the caller's wallet arrives
//! in the request and is trusted, per the deployment's outer auth layer.
//! Balance and listing validation always happens in the engine
//! regardless.

use crate::api::websocket::{MarketEvent, WsBroadcaster};
use crate::ledger::{LedgerError, LedgerEvent};
use crate::listings::{ListingError, ListingStatus};
use crate::market::{Market, MarketError, RetirementPolicy, TradeRecord};
use crate::registry::{Business, RegistryError};
use crate::storage::Storage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub market: Arc<RwLock<Market>>,
    pub storage: Arc<Storage>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct BusinessInfo {
    pub ledger_id: String,
    pub name: String,
    pub symbol: String,
    pub controller: String,
    pub created_at: DateTime<Utc>,
    pub total_supply: u128,
    pub reserve_account: Option<String>,
    pub holder_count: usize,
}

impl From<&Business> for BusinessInfo {
    fn from(business: &Business) -> Self {
        Self {
            ledger_id: business.ledger.id.clone(),
            name: business.name.clone(),
            symbol: business.symbol.clone(),
            controller: business.controller.clone(),
            created_at: business.created_at,
            total_supply: business.ledger.total_supply(),
            reserve_account: business.ledger.reserve_account().map(String::from),
            holder_count: business.ledger.holder_count(),
        }
    }
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub ledger_id: String,
}

#[derive(Serialize)]
pub struct ListingInfo {
    pub index: usize,
    pub ledger_id: String,
    pub seller: String,
    pub amount: u128,
    pub price_per_unit: u128,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CreateListingResponse {
    pub index: usize,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub ledger_id: String,
    pub holder: String,
    pub balance: u128,
    pub total_supply: u128,
}

#[derive(Serialize)]
pub struct FundsResponse {
    pub account: String,
    pub balance: u128,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub ledger_id: String,
    pub events: Vec<LedgerEvent>,
}

#[derive(Serialize)]
pub struct TradesResponse {
    pub trades: Vec<TradeRecord>,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterBusinessRequest {
    pub name: String,
    pub symbol: String,
    pub wallet: String,
}

#[derive(Deserialize)]
pub struct PrimaryBuyRequest {
    pub ledger_id: String,
    pub buyer: String,
    pub amount: u128,
    pub price_per_unit: u128,
}

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub ledger_id: String,
    pub seller: String,
    pub amount: u128,
    pub price_per_unit: u128,
}

#[derive(Deserialize)]
pub struct BuyListingRequest {
    pub buyer: String,
}

#[derive(Deserialize)]
pub struct CancelListingRequest {
    pub caller: String,
}

#[derive(Deserialize)]
pub struct BuybackRequest {
    pub ledger_id: String,
    pub wallet: String,
    pub amount: u128,
    pub price_per_unit: u128,
    pub policy: RetirementPolicy,
}

#[derive(Deserialize)]
pub struct MintBurnRequest {
    pub wallet: String,
    pub holder: String,
    pub amount: u128,
}

#[derive(Deserialize)]
pub struct ReserveRequest {
    pub wallet: String,
    pub account: String,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub account: String,
    pub amount: u128,
}

// ============================================================================
// Error mapping
// ============================================================================

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn map_error(err: MarketError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        MarketError::Registry(RegistryError::NotFound(_))
        | MarketError::Listing(ListingError::NotFound(_))
        | MarketError::NoMatchingListing { .. } => StatusCode::NOT_FOUND,
        MarketError::Registry(RegistryError::DuplicateRegistration { .. }) => StatusCode::CONFLICT,
        MarketError::Ledger(LedgerError::Unauthorized { .. }) => StatusCode::FORBIDDEN,
        MarketError::Listing(ListingError::NotSeller { .. }) => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

fn map_storage_error(err: crate::storage::StorageError) -> (StatusCode, Json<ApiError>) {
    log::error!("Failed to persist market state: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

async fn persist(state: &ApiState, market: &Market) -> Result<(), (StatusCode, Json<ApiError>)> {
    state.storage.save(market).map_err(map_storage_error)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Liveness check
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/businesses - Register a business
pub async fn register_business(
    State(state): State<ApiState>,
    Json(req): Json<RegisterBusinessRequest>,
) -> ApiResult<RegisterResponse> {
    let mut market = state.market.write().await;

    let ledger_id = market
        .register_business(req.name.clone(), req.symbol.clone(), &req.wallet)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    state.ws_broadcaster.broadcast(MarketEvent::BusinessRegistered {
        ledger_id: ledger_id.clone(),
        name: req.name,
        symbol: req.symbol,
    });

    Ok(Json(RegisterResponse { ledger_id }))
}

/// GET /api/businesses - List registered businesses
pub async fn list_businesses(State(state): State<ApiState>) -> Json<Vec<BusinessInfo>> {
    let market = state.market.read().await;
    Json(market.businesses().into_iter().map(BusinessInfo::from).collect())
}

/// GET /api/businesses/{ledger_id} - Look up one business
pub async fn get_business(
    State(state): State<ApiState>,
    Path(ledger_id): Path<String>,
) -> ApiResult<BusinessInfo> {
    let market = state.market.read().await;
    let business = market.business(&ledger_id).map_err(map_error)?;
    Ok(Json(BusinessInfo::from(business)))
}

/// POST /api/market/primary - Buy units directly from the business
pub async fn buy_from_business(
    State(state): State<ApiState>,
    Json(req): Json<PrimaryBuyRequest>,
) -> ApiResult<BalanceResponse> {
    let mut market = state.market.write().await;

    market
        .buy_from_business(&req.ledger_id, &req.buyer, req.amount, req.price_per_unit)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    state.ws_broadcaster.broadcast(MarketEvent::SharesPurchased {
        ledger_id: req.ledger_id.clone(),
        buyer: req.buyer.clone(),
        amount: req.amount,
        price_per_unit: req.price_per_unit,
    });

    let balance = market.balance_of(&req.ledger_id, &req.buyer).map_err(map_error)?;
    let total_supply = market.total_supply(&req.ledger_id).map_err(map_error)?;
    Ok(Json(BalanceResponse {
        ledger_id: req.ledger_id,
        holder: req.buyer,
        balance,
        total_supply,
    }))
}

/// POST /api/market/listings - List units for sale
pub async fn create_listing(
    State(state): State<ApiState>,
    Json(req): Json<CreateListingRequest>,
) -> ApiResult<CreateListingResponse> {
    let mut market = state.market.write().await;

    let index = market
        .list_shares_for_sale(&req.ledger_id, &req.seller, req.amount, req.price_per_unit)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    state.ws_broadcaster.broadcast(MarketEvent::ListingCreated {
        ledger_id: req.ledger_id,
        index,
        seller: req.seller,
        amount: req.amount,
        price_per_unit: req.price_per_unit,
    });

    Ok(Json(CreateListingResponse { index }))
}

/// GET /api/market/listings/{ledger_id} - Listings for a ledger
pub async fn get_listings(
    State(state): State<ApiState>,
    Path(ledger_id): Path<String>,
) -> ApiResult<Vec<ListingInfo>> {
    let market = state.market.read().await;
    market.business(&ledger_id).map_err(map_error)?;

    let listings = market
        .listings_for_ledger(&ledger_id)
        .into_iter()
        .map(|(index, l)| ListingInfo {
            index,
            ledger_id: l.ledger_id.clone(),
            seller: l.seller.clone(),
            amount: l.amount,
            price_per_unit: l.price_per_unit,
            status: l.status,
            created_at: l.created_at,
        })
        .collect();
    Ok(Json(listings))
}

/// POST /api/market/listings/{ledger_id}/{index}/buy - Buy out a listing
pub async fn buy_from_investor(
    State(state): State<ApiState>,
    Path((ledger_id, index)): Path<(String, usize)>,
    Json(req): Json<BuyListingRequest>,
) -> ApiResult<BalanceResponse> {
    let mut market = state.market.write().await;

    market
        .buy_from_investor(&ledger_id, index, &req.buyer)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    state.ws_broadcaster.broadcast(MarketEvent::ListingFulfilled {
        ledger_id: ledger_id.clone(),
        index,
        buyer: req.buyer.clone(),
    });

    let balance = market.balance_of(&ledger_id, &req.buyer).map_err(map_error)?;
    let total_supply = market.total_supply(&ledger_id).map_err(map_error)?;
    Ok(Json(BalanceResponse {
        ledger_id,
        holder: req.buyer,
        balance,
        total_supply,
    }))
}

/// POST /api/market/listings/{ledger_id}/{index}/cancel - Cancel a listing
pub async fn cancel_listing(
    State(state): State<ApiState>,
    Path((ledger_id, index)): Path<(String, usize)>,
    Json(req): Json<CancelListingRequest>,
) -> ApiResult<serde_json::Value> {
    let mut market = state.market.write().await;

    market
        .cancel_listing(&ledger_id, index, &req.caller)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    state
        .ws_broadcaster
        .broadcast(MarketEvent::ListingCancelled { ledger_id, index });

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/market/buyback - Business repurchases units
pub async fn business_buyback(
    State(state): State<ApiState>,
    Json(req): Json<BuybackRequest>,
) -> ApiResult<BalanceResponse> {
    let mut market = state.market.write().await;

    market
        .business_buyback(
            &req.ledger_id,
            &req.wallet,
            req.amount,
            req.price_per_unit,
            req.policy,
        )
        .map_err(map_error)?;
    persist(&state, &market).await?;

    state.ws_broadcaster.broadcast(MarketEvent::BuybackCompleted {
        ledger_id: req.ledger_id.clone(),
        amount: req.amount,
        policy: req.policy,
    });

    let total_supply = market.total_supply(&req.ledger_id).map_err(map_error)?;
    let balance = market.balance_of(&req.ledger_id, &req.wallet).map_err(map_error)?;
    Ok(Json(BalanceResponse {
        ledger_id: req.ledger_id,
        holder: req.wallet,
        balance,
        total_supply,
    }))
}

/// POST /api/ledgers/{ledger_id}/mint - Mint units (controller only)
pub async fn mint(
    State(state): State<ApiState>,
    Path(ledger_id): Path<String>,
    Json(req): Json<MintBurnRequest>,
) -> ApiResult<BalanceResponse> {
    let mut market = state.market.write().await;

    market
        .mint(&ledger_id, &req.wallet, &req.holder, req.amount)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    let balance = market.balance_of(&ledger_id, &req.holder).map_err(map_error)?;
    let total_supply = market.total_supply(&ledger_id).map_err(map_error)?;
    Ok(Json(BalanceResponse {
        ledger_id,
        holder: req.holder,
        balance,
        total_supply,
    }))
}

/// POST /api/ledgers/{ledger_id}/burn - Burn units (controller only)
pub async fn burn(
    State(state): State<ApiState>,
    Path(ledger_id): Path<String>,
    Json(req): Json<MintBurnRequest>,
) -> ApiResult<BalanceResponse> {
    let mut market = state.market.write().await;

    market
        .burn(&ledger_id, &req.wallet, &req.holder, req.amount)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    let balance = market.balance_of(&ledger_id, &req.holder).map_err(map_error)?;
    let total_supply = market.total_supply(&ledger_id).map_err(map_error)?;
    Ok(Json(BalanceResponse {
        ledger_id,
        holder: req.holder,
        balance,
        total_supply,
    }))
}

/// POST /api/ledgers/{ledger_id}/reserve - Set the reserve account
pub async fn set_reserve_account(
    State(state): State<ApiState>,
    Path(ledger_id): Path<String>,
    Json(req): Json<ReserveRequest>,
) -> ApiResult<serde_json::Value> {
    let mut market = state.market.write().await;

    market
        .set_reserve_account(&ledger_id, &req.wallet, &req.account)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/ledgers/{ledger_id}/balances/{holder} - Unit balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path((ledger_id, holder)): Path<(String, String)>,
) -> ApiResult<BalanceResponse> {
    let market = state.market.read().await;

    let balance = market.balance_of(&ledger_id, &holder).map_err(map_error)?;
    let total_supply = market.total_supply(&ledger_id).map_err(map_error)?;
    Ok(Json(BalanceResponse {
        ledger_id,
        holder,
        balance,
        total_supply,
    }))
}

/// GET /api/ledgers/{ledger_id}/history - Ledger audit history
pub async fn get_history(
    State(state): State<ApiState>,
    Path(ledger_id): Path<String>,
) -> ApiResult<HistoryResponse> {
    let market = state.market.read().await;

    let events = market.ledger_history(&ledger_id).map_err(map_error)?.to_vec();
    Ok(Json(HistoryResponse { ledger_id, events }))
}

/// GET /api/trades - Completed trades across all ledgers
pub async fn get_trades(State(state): State<ApiState>) -> Json<TradesResponse> {
    let market = state.market.read().await;
    Json(TradesResponse {
        trades: market.trades().to_vec(),
    })
}

/// POST /api/funds/deposit - Credit a cash account
pub async fn deposit_funds(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<FundsResponse> {
    let mut market = state.market.write().await;

    market
        .deposit_funds(&req.account, req.amount)
        .map_err(map_error)?;
    persist(&state, &market).await?;

    Ok(Json(FundsResponse {
        balance: market.funds_of(&req.account),
        account: req.account,
    }))
}

/// GET /api/funds/{account} - Cash balance
pub async fn get_funds(
    State(state): State<ApiState>,
    Path(account): Path<String>,
) -> Json<FundsResponse> {
    let market = state.market.read().await;
    Json(FundsResponse {
        balance: market.funds_of(&account),
        account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = map_error(MarketError::Registry(RegistryError::NotFound(
            "0xNONE".to_string(),
        )));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = map_error(MarketError::Ledger(LedgerError::Unauthorized {
            caller: "intruder".to_string(),
        }));
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = map_error(MarketError::Registry(
            RegistryError::DuplicateRegistration {
                name: "Bakery".to_string(),
                symbol: "BRK".to_string(),
            },
        ));
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = map_error(MarketError::Ledger(LedgerError::InsufficientBalance {
            have: 1,
            need: 2,
        }));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_business_info_from_business() {
        let mut market = Market::new();
        let ledger_id = market
            .register_business("Corner Bakery".to_string(), "BRK".to_string(), "owner")
            .unwrap();
        market.mint(&ledger_id, "owner", "investor", 10).unwrap();

        let info = BusinessInfo::from(market.business(&ledger_id).unwrap());
        assert_eq!(info.ledger_id, ledger_id);
        assert_eq!(info.symbol, "BRK");
        assert_eq!(info.total_supply, 10);
        assert_eq!(info.holder_count, 1);
    }
}
