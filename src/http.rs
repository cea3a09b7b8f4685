use crate::cache::RedisCache;
use crate::database::{AuctionRecord, Database, PgStore};
use crate::interfaces::ContractInterfaces;
use crate::prices::{get_reference_price, PriceOracle};
use crate::reader::AuctionStateReader;
use crate::utils::lock_connectable_mutex_safely;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ethers::types::Address;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything a request handler can touch. `chain` is absent when the
/// process runs without RPC configuration; the chain-backed endpoints then
/// answer 500 instead of crashing anything.
pub struct AppState {
    pub chain: Option<ChainContext>,
    pub interfaces: Arc<ContractInterfaces>,
    pub cache: Arc<Mutex<RedisCache>>,
    pub db: Arc<Mutex<PgStore>>,
}

pub struct ChainContext {
    pub reader: AuctionStateReader,
    pub oracle: PriceOracle,
}

/// Auction registration as the web client sends it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuctionRequest {
    pub auction_address: String,
    pub nft_address: String,
    pub token_id: i64,
    pub seller: String,
    pub end_time: i64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auctions", get(list_auctions).post(create_auction))
        .route("/api/auctions/:address", get(get_auction))
        .route("/api/prices", get(get_prices))
        .route("/abi/factory", get(factory_abi))
        .route("/abi/auction", get(auction_abi))
        .route("/abi/erc20", get(erc20_abi))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn cors<B>(request: Request<B>, next: Next<B>) -> Response {
    if request.method() == Method::OPTIONS {
        return with_cors_headers(StatusCode::NO_CONTENT.into_response());
    }
    with_cors_headers(next.run(request).await)
}

fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    response
}

fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

async fn list_auctions(State(state): State<Arc<AppState>>) -> Response {
    let mut db = match lock_connectable_mutex_safely(&state.db).await {
        Ok(db) => db,
        Err(e) => return internal_error(e),
    };
    match db.list_auctions().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn create_auction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAuctionRequest>,
) -> Response {
    let record = AuctionRecord {
        auction_address: request.auction_address,
        nft_address: request.nft_address,
        token_id: request.token_id,
        seller: request.seller,
        end_time: request.end_time,
        created_at: None,
    };
    let mut db = match lock_connectable_mutex_safely(&state.db).await {
        Ok(db) => db,
        Err(e) => return internal_error(e),
    };
    match db.upsert_auction(&record).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_auction(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Response {
    let chain = match state.chain.as_ref() {
        Some(chain) => chain,
        None => return internal_error("chain not configured"),
    };
    let address = match Address::from_str(&address) {
        Ok(address) => address,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid auction address" })),
            )
                .into_response()
        }
    };
    match chain.reader.read_auction_state(address).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

async fn get_prices(State(state): State<Arc<AppState>>) -> Response {
    let chain = match state.chain.as_ref() {
        Some(chain) => chain,
        None => return internal_error("chain not configured"),
    };
    match get_reference_price(&chain.oracle, &state.cache).await {
        Ok(price) => Json(json!({ "ethUsd": price })).into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

async fn factory_abi(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({ "abi": state.interfaces.factory_document() })).into_response()
}

async fn auction_abi(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({ "abi": state.interfaces.auction_document() })).into_response()
}

async fn erc20_abi(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({ "abi": state.interfaces.erc20_document() })).into_response()
}
