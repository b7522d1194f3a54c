//! Page planning: the pure half of a reconciliation pass.
//!
//! # Algorithm
//!
//! 1. A page that failed upstream yields no ids, no fetches and a generic
//!    list error
//! 2. Otherwise every item's remote id goes into the id list, in page order
//! 3. Items without a local record are skipped: a page never creates orders
//! 4. Items whose local fingerprint differs are scheduled for a full fetch
//!
//! The planner does no IO. The [`ListSyncCoordinator`](crate::ListSyncCoordinator)
//! supplies the bulk lookup and carries out the plan.

use crate::{
    detector::is_stale,
    error::SyncError,
    order::{OrderListItem, OrderRecord},
    RemoteId,
};
use std::collections::HashMap;

/// What one listing page asks the engine to do.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PagePlan {
    /// Every remote id the page returned, in page order
    pub ids: Vec<RemoteId>,
    /// Locally known records whose fingerprint changed, in page order
    pub stale: Vec<OrderRecord>,
    /// Page items with no local record
    pub skipped: usize,
    /// List-level error, always generic
    pub error: Option<SyncError>,
}

impl PagePlan {
    /// Plan for a page that failed upstream.
    pub fn failed(error: SyncError) -> Self {
        Self {
            error: Some(error.into_generic()),
            ..Self::default()
        }
    }
}

/// The remote ids of a page, in page order.
pub fn page_ids(items: &[OrderListItem]) -> Vec<RemoteId> {
    items.iter().map(|item| item.remote_id).collect()
}

/// Diff a page against the locally known subset of its orders.
///
/// `known` must hold only records that exist locally for the page's owner,
/// keyed by remote id.
pub fn plan_page(
    items: &[OrderListItem],
    known: &HashMap<RemoteId, OrderRecord>,
    error: Option<SyncError>,
) -> PagePlan {
    if let Some(error) = error {
        return PagePlan::failed(error);
    }

    let mut plan = PagePlan {
        ids: page_ids(items),
        ..PagePlan::default()
    };

    for item in items {
        let Some(local) = known.get(&item.remote_id) else {
            plan.skipped += 1;
            continue;
        };

        if is_stale(local, item) {
            plan.stale.push(local.clone());
        }
    }

    plan
}
