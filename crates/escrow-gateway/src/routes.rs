//! # Gateway Routes
//!
//! Stateless request handlers over the relayer core, plus the two pieces of
//! process-local state: the off-ledger metadata store and the rate limiter.
//! Handlers never hold the ledger connection exclusively; each request
//! performs its own calls against the shared client handle.

use crate::config::GatewayConfig;
use crate::error::{map_trigger_error, ApiError};
use crate::metadata::MetadataStore;
use crate::rate_limit::{RateLimitLayer, RateLimitState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use escrow_ledger::{format_units, keccak256, ConditionId};
use escrow_relayer::RelayerService;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub relayer: Arc<RelayerService>,
    pub metadata: Arc<dyn MetadataStore>,
    pub config: Arc<GatewayConfig>,
}

/// Builds the gateway router and hands back the rate limiter state so the
/// host can spawn the cleanup task.
pub fn router(state: AppState) -> (Router, Arc<RateLimitState>) {
    let rate_limit = RateLimitLayer::new(state.config.rate_limit.clone());
    let limiter_state = rate_limit.state();

    // Only /api routes count against the window; health probes stay cheap
    // and unthrottled.
    let api = Router::new()
        .route("/conditions", get(list_conditions).post(store_metadata))
        .route("/conditions/:id", get(condition_status))
        .route("/conditions/:id/trigger", post(trigger_condition))
        .layer(rate_limit);

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    (router, limiter_state)
}

fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    error!("panic while handling request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /health` — relayer liveness and condition count. Must not crash
/// when the ledger is unreachable; reports unhealthy instead.
async fn health(State(state): State<AppState>) -> Response {
    let balance = state.relayer.relayer_balance().await;
    let count = state.relayer.condition_count().await;

    match (balance, count) {
        (Ok(balance), Ok(count)) => Json(json!({
            "status": "healthy",
            "network": state.config.network,
            "relayerBalance": format_units(balance),
            "totalConditions": count,
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        (balance, count) => {
            error!(?balance, ?count, "health probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "unhealthy",
                    "error": "Failed to fetch relayer status",
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreMetadataRequest {
    condition_id: Option<ConditionId>,
    metadata: Option<Value>,
}

/// `POST /api/conditions` — pure local write, never touches the ledger.
async fn store_metadata(
    State(state): State<AppState>,
    Json(req): Json<StoreMetadataRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = req
        .condition_id
        .ok_or_else(|| ApiError::Validation("conditionId is required".into()))?;

    state.metadata.put(id, req.metadata.unwrap_or_else(|| json!({})));
    Ok(Json(json!({
        "success": true,
        "conditionId": id,
        "message": "Condition metadata stored",
    })))
}

/// `GET /api/conditions/:id` — ledger truth merged with local metadata and
/// the derived status string.
async fn condition_status(
    State(state): State<AppState>,
    Path(id): Path<ConditionId>,
) -> Result<Json<Value>, ApiError> {
    let condition = state
        .relayer
        .get_condition(id)
        .await
        .map_err(|err| {
            error!(%err, id, "failed to fetch condition");
            ApiError::Ledger("Failed to fetch condition status".into())
        })?
        .ok_or_else(|| ApiError::NotFound("Condition not found".into()))?;

    let can_trigger = state.relayer.can_trigger(id).await.unwrap_or(false);
    let can_refund = state.relayer.can_refund(id).await.unwrap_or(false);
    let status = if condition.executed {
        "executed"
    } else if condition.refunded {
        "refunded"
    } else {
        "active"
    };
    let metadata = state
        .metadata
        .get(id)
        .map(|r| r.metadata)
        .unwrap_or_else(|| json!({}));

    let mut body = serde_json::to_value(&condition).map_err(|_| ApiError::Internal)?;
    body["metadata"] = metadata;
    body["canTrigger"] = json!(can_trigger);
    body["canRefund"] = json!(can_refund);
    body["status"] = json!(status);
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRequest {
    proof: Option<String>,
    api_key: Option<String>,
}

/// `POST /api/conditions/:id/trigger` — the gated mutation path.
///
/// Order matters: the shared secret is checked before the proof or the
/// ledger is touched; terminal states are pre-checked locally for a
/// specific 400 before any submission is paid for.
async fn trigger_condition(
    State(state): State<AppState>,
    Path(id): Path<ConditionId>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.api_key.as_deref() != Some(state.config.api_key.as_str()) {
        return Err(ApiError::Unauthorized);
    }

    let proof = match req.proof {
        Some(proof) if !proof.is_empty() => proof,
        _ => return Err(ApiError::Validation("Proof is required".into())),
    };

    let condition = state
        .relayer
        .get_condition(id)
        .await
        .map_err(map_trigger_error)?
        .ok_or_else(|| ApiError::NotFound("Condition not found".into()))?;
    if condition.executed {
        return Err(ApiError::StateConflict("Condition already executed".into()));
    }
    if condition.refunded {
        return Err(ApiError::StateConflict("Condition already refunded".into()));
    }

    // Only the digest travels to the ledger, never the raw proof
    let proof_hash = keccak256(proof.as_bytes());
    let outcome = state
        .relayer
        .trigger_condition(id, proof_hash)
        .await
        .map_err(map_trigger_error)?;

    Ok(Json(json!({
        "success": true,
        "conditionId": id,
        "txHash": outcome.tx_hash.to_string(),
        "blockNumber": outcome.block_number,
        "gasUsed": outcome.gas_used.to_string(),
        "message": "Condition triggered successfully",
    })))
}

/// `GET /api/conditions` — full enumeration. One bad id never fails the
/// whole listing.
async fn list_conditions(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let count = state.relayer.condition_count().await.map_err(|err| {
        error!(%err, "failed to fetch condition count");
        ApiError::Ledger("Failed to fetch conditions".into())
    })?;

    let mut conditions = Vec::with_capacity(count as usize);
    for id in 0..count {
        match state.relayer.get_condition(id).await {
            Ok(Some(condition)) => conditions.push(condition),
            Ok(None) => debug!(id, "skipping missing condition"),
            Err(err) => debug!(id, %err, "skipping unreadable condition"),
        }
    }

    Ok(Json(json!({
        "total": count,
        "conditions": conditions,
    })))
}
