use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, Transaction};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Every response body: `{"status": "success" | "error", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

impl Envelope<String> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: message.into(),
        }
    }
}

/// Absent fields bind to their zero values; only unparseable or mistyped
/// bodies are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct TxIdResponse {
    #[serde(rename = "txID")]
    pub tx_id: String,
}

#[derive(Debug, Serialize)]
pub struct MineResponse {
    pub index: u64,
    pub proof: u64,
    pub timestamp: i64,
    pub prevhash: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub height: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/blockchain", get(get_blockchain))
        .route("/blockchain/validate", get(validate_blockchain))
        .route("/transaction", post(add_transaction))
        .route("/mempool", get(get_mempool))
        .route("/mine", get(mine_block))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_blockchain(State(state): State<AppState>) -> ApiResult<Vec<Block>> {
    let chain = state.chain.read().await;
    Ok(Json(Envelope::success(chain.blocks().to_vec())))
}

async fn validate_blockchain(State(state): State<AppState>) -> ApiResult<ValidationResponse> {
    let chain = state.chain.read().await;
    let outcome = chain.validate();
    if let Err(e) = &outcome {
        warn!(error = %e, "chain failed validation");
    }
    Ok(Json(Envelope::success(ValidationResponse {
        valid: outcome.is_ok(),
        height: chain.height(),
        error: outcome.err().map(|e| e.to_string()),
    })))
}

async fn add_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<TxIdResponse> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(%rejection, "malformed transaction payload");
        ApiError::InvalidInput("Invalid data".to_string())
    })?;
    let tx_id = state.submit(req.sender, req.recipient, req.amount).await?;
    Ok(Json(Envelope::success(TxIdResponse { tx_id })))
}

async fn get_mempool(State(state): State<AppState>) -> ApiResult<Vec<Transaction>> {
    let mempool = state.mempool.lock().await;
    Ok(Json(Envelope::success(mempool.snapshot())))
}

async fn mine_block(State(state): State<AppState>) -> ApiResult<MineResponse> {
    let mined = state.mine().await?;
    info!(index = mined.index, proof = mined.proof, txs = mined.tx_count, "block mined via api");
    Ok(Json(Envelope::success(MineResponse {
        index: mined.index,
        proof: mined.proof,
        timestamp: mined.timestamp,
        prevhash: mined.previous_hash,
    })))
}
