//! Single-order routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use orderflux_engine::LocalId;

use crate::error::Result;
use crate::handlers::{
    handle_lookup, handle_refresh, LookupRequest, LookupResponse, RefreshAccepted, RefreshRequest,
};
use crate::AppState;

/// Create order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/lookup", post(lookup_handler))
        .route("/orders/{local_id}/refresh", post(refresh_handler))
}

/// POST /orders/lookup - Cached orders by local or remote id.
async fn lookup_handler(
    State(state): State<AppState>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<LookupResponse>> {
    let response = handle_lookup(&state.store, request).await?;
    Ok(Json(response))
}

/// POST /orders/{local_id}/refresh - Queue a remote fetch of one order.
async fn refresh_handler(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
    body: Option<Json<RefreshRequest>>,
) -> Result<(StatusCode, Json<RefreshAccepted>)> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let accepted = handle_refresh(state.store.pool(), &state.dispatcher, local_id, request).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
