//! In-memory [`LocalStore`].
//!
//! Holds orders in a map keyed by local id. Useful for tests and for
//! embedders that persist the cache some other way.

use crate::{
    collaborators::LocalStore,
    error::Result,
    list::{ListDescriptor, ListOrder, ListOrderBy},
    order::{LocalOrRemoteId, OrderRecord},
    LocalId, OwnerId, RemoteId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    /// BTreeMap for deterministic iteration order
    orders: BTreeMap<LocalId, OrderRecord>,
    next_id: LocalId,
}

impl Inner {
    fn find(&self, order: &OrderRecord) -> Option<LocalId> {
        if self.orders.contains_key(&order.local_id) {
            return Some(order.local_id);
        }
        let remote_id = order.remote_id?;
        self.orders
            .values()
            .find(|o| o.owner_id == order.owner_id && o.remote_id == Some(remote_id))
            .map(|o| o.local_id)
    }

    fn insert_new(&mut self, mut order: OrderRecord) -> LocalId {
        self.next_id = self.next_id.max(order.local_id) + 1;
        let local_id = if order.local_id > 0 && !self.orders.contains_key(&order.local_id) {
            order.local_id
        } else {
            self.next_id
        };
        order.local_id = local_id;
        self.orders.insert(local_id, order);
        local_id
    }
}

/// A [`LocalStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Inner>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `orders`, keeping their local ids.
    pub fn with_orders(orders: impl IntoIterator<Item = OrderRecord>) -> Self {
        let mut inner = Inner::default();
        for order in orders {
            inner.insert_new(order);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Add an order as a local client would, returning its local id.
    pub async fn insert(&self, order: OrderRecord) -> LocalId {
        self.inner.write().await.insert_new(order)
    }

    /// Get an order by local id.
    pub async fn get(&self, local_id: LocalId) -> Option<OrderRecord> {
        self.inner.read().await.orders.get(&local_id).cloned()
    }

    /// All orders, by local id.
    pub async fn all(&self) -> Vec<OrderRecord> {
        self.inner.read().await.orders.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LocalStore for InMemoryOrderStore {
    async fn orders_by_remote_ids(
        &self,
        remote_ids: &[RemoteId],
        owner: OwnerId,
    ) -> Result<HashMap<RemoteId, OrderRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.owner_id == owner)
            .filter_map(|o| {
                let remote_id = o.remote_id?;
                remote_ids.contains(&remote_id).then(|| (remote_id, o.clone()))
            })
            .collect())
    }

    async fn overwrite_upsert(&self, order: &OrderRecord) -> Result<u64> {
        let mut inner = self.inner.write().await;

        if let Some(local_id) = inner.find(order) {
            let mut updated = order.clone();
            updated.local_id = local_id;
            updated.is_locally_changed = false;
            inner.orders.insert(local_id, updated);
            return Ok(1);
        }

        if order.remote_id.is_none() {
            return Ok(0);
        }

        let mut fresh = order.clone();
        fresh.is_locally_changed = false;
        inner.insert_new(fresh);
        Ok(1)
    }

    async fn orders_by_local_or_remote_ids(
        &self,
        ids: &[LocalOrRemoteId],
        owner: OwnerId,
    ) -> Result<Vec<OrderRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.owner_id == owner && ids.iter().any(|id| o.matches(id)))
            .cloned()
            .collect())
    }

    async fn local_ids_for_descriptor(&self, descriptor: &ListDescriptor) -> Result<Vec<LocalId>> {
        let inner = self.inner.read().await;
        let owner = descriptor.owner().id;

        let mut orders: Vec<_> = inner.orders.values().filter(|o| o.owner_id == owner).collect();
        match descriptor.order_by() {
            ListOrderBy::Date => orders.sort_by(|a, b| {
                a.date_created
                    .cmp(&b.date_created)
                    .then(a.local_id.cmp(&b.local_id))
            }),
            ListOrderBy::Id => orders.sort_by_key(|o| o.local_id),
        }
        if descriptor.order() == ListOrder::Desc {
            orders.reverse();
        }

        Ok(orders.into_iter().map(|o| o.local_id).collect())
    }
}
