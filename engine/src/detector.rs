//! Change detection between a local record and a remote summary.

use crate::order::{OrderListItem, OrderRecord, OrderStatus};
use serde::{Deserialize, Serialize};

/// The `(last_modified, status)` pair used as a cheap staleness proxy.
///
/// No other field takes part in the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub last_modified: String,
    pub status: OrderStatus,
}

impl Fingerprint {
    pub fn new(last_modified: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            last_modified: last_modified.into(),
            status,
        }
    }
}

/// True when the local record no longer matches the remote summary.
///
/// Status is compared separately from the marker: a remote status change
/// does not always move the last-modified marker.
pub fn is_stale(local: &OrderRecord, remote: &OrderListItem) -> bool {
    local.last_modified != remote.last_modified || local.status != remote.status
}
