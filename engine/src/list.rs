//! List descriptors, partition keys and the per-page reconciled event.

use crate::{error::SyncError, order::Owner, OwnerId, RemoteId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field an order list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrderBy {
    #[default]
    Date,
    Id,
}

impl ListOrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListOrderBy::Date => "date",
            ListOrderBy::Id => "id",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    Asc,
    #[default]
    Desc,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListOrder::Asc => "asc",
            ListOrder::Desc => "desc",
        }
    }
}

/// Shape of an order list query.
///
/// One variant per protocol the list can be served over. Handlers match
/// exhaustively, so a new protocol has to be wired everywhere it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ListDescriptor {
    /// An owner's orders, served by the REST API.
    #[serde(rename_all = "camelCase")]
    RestOwner {
        owner: Owner,
        #[serde(default)]
        order_by: ListOrderBy,
        #[serde(default)]
        order: ListOrder,
    },
}

impl ListDescriptor {
    pub fn rest_owner(owner: Owner, order_by: ListOrderBy, order: ListOrder) -> Self {
        ListDescriptor::RestOwner {
            owner,
            order_by,
            order,
        }
    }

    pub fn owner(&self) -> &Owner {
        match self {
            ListDescriptor::RestOwner { owner, .. } => owner,
        }
    }

    pub fn order_by(&self) -> ListOrderBy {
        match self {
            ListDescriptor::RestOwner { order_by, .. } => *order_by,
        }
    }

    pub fn order(&self) -> ListOrder {
        match self {
            ListDescriptor::RestOwner { order, .. } => *order,
        }
    }

    pub fn kind(&self) -> ListKind {
        match self {
            ListDescriptor::RestOwner { .. } => ListKind::OwnerOrders,
        }
    }

    /// Key of the partition this list belongs to.
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey {
            kind: self.kind(),
            owner: self.owner().id,
        }
    }
}

/// Kind of list a partition groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    OwnerOrders,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::OwnerOrders => "owner-orders",
        }
    }
}

/// Groups every list that must be invalidated together.
///
/// Lists of the same owner share a key whatever their ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKey {
    pub kind: ListKind,
    pub owner: OwnerId,
}

impl PartitionKey {
    pub fn owner_orders(owner: OwnerId) -> Self {
        Self {
            kind: ListKind::OwnerOrders,
            owner,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.owner)
    }
}

/// Outcome of one reconciliation pass, handed to list consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReconciled {
    pub descriptor: ListDescriptor,
    /// Remote ids returned by the page, in page order
    pub ids: Vec<RemoteId>,
    pub loaded_more: bool,
    pub can_load_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_ignores_ordering() {
        let owner = Owner::rest(7);
        let by_date = ListDescriptor::rest_owner(owner, ListOrderBy::Date, ListOrder::Desc);
        let by_id = ListDescriptor::rest_owner(owner, ListOrderBy::Id, ListOrder::Asc);

        assert_eq!(by_date.partition_key(), by_id.partition_key());
        assert_eq!(by_date.partition_key(), PartitionKey::owner_orders(7));
        assert_ne!(by_date.partition_key(), PartitionKey::owner_orders(8));
    }

    #[test]
    fn partition_key_display() {
        assert_eq!(PartitionKey::owner_orders(42).to_string(), "owner-orders:42");
    }

    #[test]
    fn descriptor_wire_format() {
        let json = r#"{"type": "restOwner", "owner": {"id": 3, "usesRestApi": true}, "orderBy": "id"}"#;
        let descriptor: ListDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(descriptor.owner().id, 3);
        assert_eq!(descriptor.order_by(), ListOrderBy::Id);
        assert_eq!(descriptor.order(), ListOrder::Desc);
    }
}
