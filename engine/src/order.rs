//! Order types: the full local record, the lightweight remote summary and
//! the owner they belong to.

use crate::{detector::Fingerprint, LocalId, OwnerId, RemoteId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Delivering,
    Receiving,
    Finished,
}

/// Statuses shown by default in order lists.
pub const DEFAULT_ORDER_STATUS_LIST: [OrderStatus; 3] = [
    OrderStatus::Delivering,
    OrderStatus::Receiving,
    OrderStatus::Finished,
];

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Delivering => "DELIVERING",
            OrderStatus::Receiving => "RECEIVING",
            OrderStatus::Finished => "FINISHED",
        }
    }

    /// Parse a status name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        DEFAULT_ORDER_STATUS_LIST
            .into_iter()
            .find(|status| value.eq_ignore_ascii_case(status.as_str()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The account whose orders are being synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: OwnerId,
    /// Whether the owner is served by the REST order API.
    pub uses_rest_api: bool,
}

impl Owner {
    /// An owner served by the REST API.
    pub fn rest(id: OwnerId) -> Self {
        Self {
            id,
            uses_rest_api: true,
        }
    }
}

/// Either side of an order's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum LocalOrRemoteId {
    LocalId(LocalId),
    RemoteId(RemoteId),
}

/// A full order as held by the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Primary key assigned by the local store (0 until stored)
    pub local_id: LocalId,
    /// Identifier on the remote; absent until the first sync
    pub remote_id: Option<RemoteId>,
    pub owner_id: OwnerId,
    /// Opaque, comparable modification marker from the remote
    pub last_modified: String,
    pub status: OrderStatus,
    pub date_created: String,
    /// Business fields the engine does not interpret
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Local edits not yet pushed to the remote
    #[serde(default)]
    pub is_locally_changed: bool,
}

impl OrderRecord {
    /// A record as received from the remote, without local identity.
    pub fn from_remote(
        remote_id: RemoteId,
        last_modified: impl Into<String>,
        status: OrderStatus,
    ) -> Self {
        Self {
            local_id: 0,
            remote_id: Some(remote_id),
            owner_id: 0,
            last_modified: last_modified.into(),
            status,
            date_created: String::new(),
            payload: serde_json::Value::Null,
            is_locally_changed: false,
        }
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_local_id(mut self, local_id: LocalId) -> Self {
        self.local_id = local_id;
        self
    }

    pub fn with_date_created(mut self, date_created: impl Into<String>) -> Self {
        self.date_created = date_created.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.last_modified.clone(), self.status)
    }

    /// Take local identity (local id and owner) from the record a fetch was
    /// issued for. Everything else stays as the remote sent it.
    pub fn adopt_local_identity(&mut self, local: &OrderRecord) {
        self.local_id = local.local_id;
        self.owner_id = local.owner_id;
        if self.remote_id.is_none() {
            self.remote_id = local.remote_id;
        }
    }

    pub fn matches(&self, id: &LocalOrRemoteId) -> bool {
        match id {
            LocalOrRemoteId::LocalId(local_id) => self.local_id == *local_id,
            LocalOrRemoteId::RemoteId(remote_id) => self.remote_id == Some(*remote_id),
        }
    }
}

/// Lightweight summary of an order as returned by a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListItem {
    pub remote_id: RemoteId,
    pub last_modified: String,
    pub status: OrderStatus,
}

impl OrderListItem {
    pub fn new(remote_id: RemoteId, last_modified: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            remote_id,
            last_modified: last_modified.into(),
            status,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.last_modified.clone(), self.status)
    }
}
