//! Handlers for single-order operations.

use orderflux_engine::{
    Dispatcher, LocalId, LocalOrRemoteId, LocalStore, OrderRecord, Owner, OwnerId,
};
use serde::{Deserialize, Serialize};

use crate::db::{self, Pool};
use crate::error::{AppError, Result};

/// Maximum number of ids accepted by a single lookup.
pub const MAX_LOOKUP_IDS: usize = 1000;

/// Request body for looking up cached orders.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub owner_id: OwnerId,
    pub ids: Vec<LocalOrRemoteId>,
}

/// Cached orders matching a lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub orders: Vec<OrderRecord>,
}

/// Request body for refreshing one order from the remote.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default = "default_uses_rest_api")]
    pub uses_rest_api: bool,
}

fn default_uses_rest_api() -> bool {
    true
}

impl Default for RefreshRequest {
    fn default() -> Self {
        Self {
            uses_rest_api: default_uses_rest_api(),
        }
    }
}

/// Acknowledges a queued order refresh.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshAccepted {
    pub local_id: LocalId,
    pub remote_id: Option<i64>,
}

/// Look up cached orders of an owner by local or remote id.
pub async fn handle_lookup(
    store: &dyn LocalStore,
    request: LookupRequest,
) -> Result<LookupResponse> {
    if request.ids.len() > MAX_LOOKUP_IDS {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_LOOKUP_IDS} ids may be looked up at once"
        )));
    }

    let orders = store
        .orders_by_local_or_remote_ids(&request.ids, request.owner_id)
        .await?;

    Ok(LookupResponse { orders })
}

/// Queue a refresh of one cached order.
///
/// The merged result is published over the events socket.
pub async fn handle_refresh(
    pool: &Pool,
    dispatcher: &Dispatcher,
    local_id: LocalId,
    request: RefreshRequest,
) -> Result<RefreshAccepted> {
    let order = db::get_order(pool, local_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {local_id}")))?;

    let owner = Owner {
        id: order.owner_id,
        uses_rest_api: request.uses_rest_api,
    };
    let accepted = RefreshAccepted {
        local_id: order.local_id,
        remote_id: order.remote_id,
    };

    tracing::debug!(local_id, owner = owner.id, "queueing order refresh");
    dispatcher.fetch_order(order, owner)?;

    Ok(accepted)
}
