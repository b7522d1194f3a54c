//! Traits the engine uses to reach the outside world.
//!
//! The remote transport, the storage engine and the list UI layer all live
//! behind these seams. The engine never retries, times out or caches on
//! their behalf.

use crate::{
    error::{Result, SyncError},
    list::{ListDescriptor, ListReconciled, PartitionKey},
    order::{LocalOrRemoteId, OrderListItem, OrderRecord, Owner},
    LocalId, OwnerId, RemoteId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One page of a remote order listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListPage {
    pub items: Vec<OrderListItem>,
    /// Whether this page continues an earlier one
    pub loaded_more: bool,
    pub can_load_more: bool,
}

/// The remote source of truth.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch one page of lightweight summaries.
    async fn fetch_order_list(
        &self,
        descriptor: &ListDescriptor,
        offset: u64,
    ) -> std::result::Result<OrderListPage, SyncError>;

    /// Fetch the full remote version of `order`.
    ///
    /// The returned record does not need local identity; the engine copies
    /// it over from `order`.
    async fn fetch_order(
        &self,
        order: &OrderRecord,
        owner: &Owner,
    ) -> std::result::Result<OrderRecord, SyncError>;
}

/// The local order cache.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Records of `owner` whose remote id is in `remote_ids`, keyed by remote id.
    /// Ids with no local record are simply absent from the map.
    async fn orders_by_remote_ids(
        &self,
        remote_ids: &[RemoteId],
        owner: OwnerId,
    ) -> Result<HashMap<RemoteId, OrderRecord>>;

    /// Insert or update `order`, replacing every mutable field and dropping
    /// any unsynced local edits. Returns the number of rows affected.
    async fn overwrite_upsert(&self, order: &OrderRecord) -> Result<u64>;

    /// Records of `owner` matching any of `ids`.
    async fn orders_by_local_or_remote_ids(
        &self,
        ids: &[LocalOrRemoteId],
        owner: OwnerId,
    ) -> Result<Vec<OrderRecord>>;

    /// Local ids of the descriptor's owner, in the descriptor's ordering.
    async fn local_ids_for_descriptor(&self, descriptor: &ListDescriptor) -> Result<Vec<LocalId>>;
}

/// Consumer of list-level notifications.
pub trait ListConsumer: Send + Sync {
    /// Called once per reconciled page, including failed ones.
    fn on_list_reconciled(&self, event: ListReconciled);

    /// Called when any order of a partition was rewritten.
    fn on_list_partition_changed(&self, key: PartitionKey);
}
