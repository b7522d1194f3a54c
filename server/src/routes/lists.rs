//! Order list routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::handlers::{
    handle_fetch_list, handle_local_list, FetchListAccepted, FetchListRequest, LocalListQuery,
    LocalListResponse,
};
use crate::AppState;

/// Create list routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lists/fetch", post(fetch_handler))
        .route("/lists/local", get(local_handler))
}

/// POST /lists/fetch - Queue a remote page fetch.
async fn fetch_handler(
    State(state): State<AppState>,
    Json(request): Json<FetchListRequest>,
) -> Result<(StatusCode, Json<FetchListAccepted>)> {
    let accepted = handle_fetch_list(&state.dispatcher, request)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// GET /lists/local - Local ids of an owner's cached orders.
async fn local_handler(
    State(state): State<AppState>,
    Query(query): Query<LocalListQuery>,
) -> Result<Json<LocalListResponse>> {
    let response = handle_local_list(&state.store, query).await?;
    Ok(Json(response))
}
