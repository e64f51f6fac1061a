use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ledger_core::{Block, ChainSnapshot, LedgerError, SharedLedger};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::constants::{INVALID_MESSAGE, MINED_MESSAGE, VALID_MESSAGE};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) ledger: SharedLedger,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Mined {
    message: &'static str,
    block: Block,
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    length: usize,
    message: &'static str,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            ApiError::Ledger(e) => e.to_string(),
            ApiError::Internal(msg) => msg,
        };
        error!(%message, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: message }),
        )
            .into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/mine_block", get(mine_block))
        .route("/get_chain", get(get_chain))
        .route("/is_valid", get(is_valid))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn mine_block(State(state): State<AppState>) -> Result<Json<Mined>, ApiError> {
    // The search is CPU bound; keep it off the async workers.
    let ledger = state.ledger.clone();
    let block = tokio::task::spawn_blocking(move || ledger.mine())
        .await
        .map_err(|e| ApiError::Internal(format!("mining task failed: {e}")))??;

    Ok(Json(Mined {
        message: MINED_MESSAGE,
        block,
    }))
}

async fn get_chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.ledger.snapshot())
}

async fn is_valid(State(state): State<AppState>) -> Json<Validity> {
    let valid = state.ledger.is_chain_valid();
    Json(Validity {
        valid,
        length: state.ledger.len(),
        message: if valid { VALID_MESSAGE } else { INVALID_MESSAGE },
    })
}
