//! Handlers for order list operations.

use orderflux_engine::{
    Dispatcher, ListDescriptor, ListOrder, ListOrderBy, LocalId, LocalStore, OwnerId, Owner,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request body for queuing a list page fetch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchListRequest {
    pub descriptor: ListDescriptor,
    #[serde(default)]
    pub offset: u64,
}

/// Acknowledges a queued list fetch.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchListAccepted {
    pub descriptor: ListDescriptor,
    pub offset: u64,
}

/// Query parameters for the cached list of an owner.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalListQuery {
    pub owner_id: OwnerId,
    #[serde(default)]
    pub order_by: ListOrderBy,
    #[serde(default)]
    pub order: ListOrder,
}

/// Local ids of a cached list, in display order.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalListResponse {
    pub ids: Vec<LocalId>,
}

/// Queue a list fetch on the sync worker.
///
/// Results arrive asynchronously over the events socket.
pub fn handle_fetch_list(
    dispatcher: &Dispatcher,
    request: FetchListRequest,
) -> Result<FetchListAccepted> {
    tracing::debug!(
        owner = request.descriptor.owner().id,
        offset = request.offset,
        "queueing list fetch"
    );

    dispatcher.fetch_order_list(request.descriptor, request.offset)?;

    Ok(FetchListAccepted {
        descriptor: request.descriptor,
        offset: request.offset,
    })
}

/// Read the cached list for an owner.
pub async fn handle_local_list(
    store: &dyn LocalStore,
    query: LocalListQuery,
) -> Result<LocalListResponse> {
    let descriptor =
        ListDescriptor::rest_owner(Owner::rest(query.owner_id), query.order_by, query.order);
    let ids = store.local_ids_for_descriptor(&descriptor).await?;

    Ok(LocalListResponse { ids })
}
