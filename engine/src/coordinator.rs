//! List synchronization: requesting pages and reconciling them against the
//! local cache.

use crate::{
    collaborators::{ListConsumer, LocalStore, RemoteSource},
    command::{Command, FetchOrderListResponse, Loopback},
    error::SyncError,
    list::{ListDescriptor, ListReconciled},
    order::OrderListItem,
    reconcile::{plan_page, PagePlan},
};
use std::collections::HashMap;
use std::sync::Arc;

/// Drives list synchronization, one page at a time.
pub struct ListSyncCoordinator {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    lists: Arc<dyn ListConsumer>,
    loopback: Loopback,
    discard_superseded_pages: bool,
    /// Latest fetch generation per descriptor
    generations: HashMap<ListDescriptor, u64>,
}

impl ListSyncCoordinator {
    pub(crate) fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        lists: Arc<dyn ListConsumer>,
        loopback: Loopback,
        discard_superseded_pages: bool,
    ) -> Self {
        Self {
            remote,
            store,
            lists,
            loopback,
            discard_superseded_pages,
            generations: HashMap::new(),
        }
    }

    /// Ask the remote for the page of `descriptor` starting at `offset`.
    ///
    /// Returns immediately; the page comes back as a
    /// [`Command::FetchedOrderList`].
    pub fn fetch(&mut self, descriptor: ListDescriptor, offset: u64) {
        let generation = self.advance_generation(descriptor, offset);

        match descriptor {
            ListDescriptor::RestOwner { owner, .. } => {
                tracing::debug!(owner = owner.id, offset, generation, "fetching order list page");

                let remote = Arc::clone(&self.remote);
                self.loopback.spawn(
                    async move {
                        let response = match remote.fetch_order_list(&descriptor, offset).await {
                            Ok(page) => FetchOrderListResponse::page(
                                descriptor,
                                page.items,
                                page.loaded_more,
                                page.can_load_more,
                            ),
                            Err(error) => {
                                FetchOrderListResponse::failed(descriptor, offset > 0, error)
                            }
                        };
                        Command::FetchedOrderList(response.with_generation(generation))
                    },
                    move |error| {
                        Command::FetchedOrderList(
                            FetchOrderListResponse::failed(descriptor, offset > 0, error)
                                .with_generation(generation),
                        )
                    },
                );
            }
        }
    }

    /// Reconcile a fetched page against the local cache.
    ///
    /// Dispatches a single-order fetch for every locally known order whose
    /// fingerprint changed, then reports the page to the list consumer.
    pub async fn reconcile(&mut self, response: FetchOrderListResponse) {
        if self.is_superseded(&response) {
            tracing::debug!(
                owner = response.descriptor.owner().id,
                generation = response.generation,
                "dropping superseded order list page"
            );
            return;
        }

        let FetchOrderListResponse {
            descriptor,
            items,
            loaded_more,
            can_load_more,
            error,
            ..
        } = response;

        let plan = match error {
            Some(error) => {
                tracing::warn!(owner = descriptor.owner().id, %error, "order list fetch failed");
                PagePlan::failed(error)
            }
            None => self.plan(&descriptor, &items).await,
        };

        tracing::debug!(
            owner = descriptor.owner().id,
            items = plan.ids.len(),
            stale = plan.stale.len(),
            skipped = plan.skipped,
            "reconciled order list page"
        );

        let owner = *descriptor.owner();
        for order in plan.stale {
            self.loopback.post(Command::FetchOrder { order, owner });
        }

        self.lists.on_list_reconciled(ListReconciled {
            descriptor,
            ids: plan.ids,
            loaded_more,
            can_load_more,
            error: plan.error,
        });
    }

    async fn plan(&self, descriptor: &ListDescriptor, items: &[OrderListItem]) -> PagePlan {
        if items.is_empty() {
            return plan_page(items, &HashMap::new(), None);
        }

        let remote_ids: Vec<_> = items.iter().map(|item| item.remote_id).collect();
        match self
            .store
            .orders_by_remote_ids(&remote_ids, descriptor.owner().id)
            .await
        {
            Ok(known) => plan_page(items, &known, None),
            Err(err) => {
                tracing::error!(owner = descriptor.owner().id, error = %err, "bulk lookup failed");
                PagePlan::failed(SyncError::from(err))
            }
        }
    }

    /// A first-page fetch starts a new generation; load-more fetches share it.
    /// Without the guard no generations are tracked and every page carries 0.
    fn advance_generation(&mut self, descriptor: ListDescriptor, offset: u64) -> u64 {
        if !self.discard_superseded_pages {
            return 0;
        }
        let generation = self.generations.entry(descriptor).or_insert(0);
        if offset == 0 {
            *generation += 1;
        }
        *generation
    }

    fn is_superseded(&self, response: &FetchOrderListResponse) -> bool {
        if !self.discard_superseded_pages {
            return false;
        }
        let current = self
            .generations
            .get(&response.descriptor)
            .copied()
            .unwrap_or(0);
        response.generation < current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Envelope;
    use crate::{
        Error, InMemoryOrderStore, ListEvent, ListOrder, ListOrderBy, OrderListPage, OrderRecord,
        OrderStatus, Owner, RemoteId,
    };
    use crate::{BroadcastListConsumer, ErrorKind};
    use async_trait::async_trait;
    use tokio::sync::{broadcast, mpsc};

    struct StaticRemote {
        page: std::result::Result<OrderListPage, SyncError>,
    }

    #[async_trait]
    impl RemoteSource for StaticRemote {
        async fn fetch_order_list(
            &self,
            _descriptor: &ListDescriptor,
            _offset: u64,
        ) -> std::result::Result<OrderListPage, SyncError> {
            self.page.clone()
        }

        async fn fetch_order(
            &self,
            order: &OrderRecord,
            _owner: &Owner,
        ) -> std::result::Result<OrderRecord, SyncError> {
            Ok(order.clone())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl LocalStore for BrokenStore {
        async fn orders_by_remote_ids(
            &self,
            _remote_ids: &[RemoteId],
            _owner: crate::OwnerId,
        ) -> crate::error::Result<HashMap<RemoteId, OrderRecord>> {
            Err(Error::Store("database is locked".into()))
        }

        async fn overwrite_upsert(&self, _order: &OrderRecord) -> crate::error::Result<u64> {
            Err(Error::Store("database is locked".into()))
        }

        async fn orders_by_local_or_remote_ids(
            &self,
            _ids: &[crate::LocalOrRemoteId],
            _owner: crate::OwnerId,
        ) -> crate::error::Result<Vec<OrderRecord>> {
            Ok(Vec::new())
        }

        async fn local_ids_for_descriptor(
            &self,
            _descriptor: &ListDescriptor,
        ) -> crate::error::Result<Vec<crate::LocalId>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        coordinator: ListSyncCoordinator,
        queue: mpsc::UnboundedReceiver<Envelope>,
        list_events: broadcast::Receiver<ListEvent>,
    }

    fn harness(store: Arc<dyn LocalStore>, remote: StaticRemote, discard: bool) -> Harness {
        let (tx, queue) = mpsc::unbounded_channel();
        let lists = Arc::new(BroadcastListConsumer::new(16));
        let list_events = lists.subscribe();
        let coordinator =
            ListSyncCoordinator::new(Arc::new(remote), store, lists, Loopback::new(tx), discard);
        Harness {
            coordinator,
            queue,
            list_events,
        }
    }

    fn empty_remote() -> StaticRemote {
        StaticRemote {
            page: Ok(OrderListPage::default()),
        }
    }

    fn descriptor() -> ListDescriptor {
        ListDescriptor::rest_owner(Owner::rest(1), ListOrderBy::Date, ListOrder::Desc)
    }

    fn local(local_id: i64, remote_id: RemoteId, marker: &str, status: OrderStatus) -> OrderRecord {
        OrderRecord::from_remote(remote_id, marker, status)
            .with_local_id(local_id)
            .with_owner(1)
    }

    fn queued_fetches(queue: &mut mpsc::UnboundedReceiver<Envelope>) -> Vec<OrderRecord> {
        let mut fetches = Vec::new();
        while let Ok(envelope) = queue.try_recv() {
            if let Envelope::Internal(Command::FetchOrder { order, .. }) = envelope {
                fetches.push(order);
            }
        }
        fetches
    }

    fn reconciled(events: &mut broadcast::Receiver<ListEvent>) -> ListReconciled {
        match events.try_recv().unwrap() {
            ListEvent::Reconciled(event) => event,
            other => panic!("expected reconciled event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reconcile_dispatches_only_stale_known_orders() {
        let store = Arc::new(InMemoryOrderStore::with_orders(vec![local(
            10,
            1,
            "t1",
            OrderStatus::Delivering,
        )]));
        let mut h = harness(store.clone(), empty_remote(), false);

        let response = FetchOrderListResponse::page(
            descriptor(),
            vec![
                OrderListItem::new(1, "t2", OrderStatus::Finished),
                OrderListItem::new(2, "t1", OrderStatus::Delivering),
            ],
            false,
            true,
        );
        h.coordinator.reconcile(response).await;

        let fetches = queued_fetches(&mut h.queue);
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].local_id, 10);

        let event = reconciled(&mut h.list_events);
        assert_eq!(event.ids, vec![1, 2]);
        assert!(event.can_load_more);
        assert!(event.error.is_none());

        // Reconciling never writes.
        let stored = store.get(10).await.unwrap();
        assert_eq!(stored.last_modified, "t1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn failed_page_reports_generic_error_and_fetches_nothing() {
        let store = Arc::new(InMemoryOrderStore::with_orders(vec![local(
            10,
            1,
            "t1",
            OrderStatus::Delivering,
        )]));
        let mut h = harness(store, empty_remote(), false);

        let mut response = FetchOrderListResponse::failed(
            descriptor(),
            false,
            SyncError::unknown_order("owner gone"),
        );
        response.items = vec![OrderListItem::new(1, "t2", OrderStatus::Finished)];
        h.coordinator.reconcile(response).await;

        assert!(queued_fetches(&mut h.queue).is_empty());
        let event = reconciled(&mut h.list_events);
        assert!(event.ids.is_empty());
        let error = event.error.unwrap();
        assert_eq!(error.kind, ErrorKind::GenericError);
        assert_eq!(error.message, "owner gone");
    }

    #[tokio::test]
    async fn lookup_failure_becomes_list_error() {
        let mut h = harness(Arc::new(BrokenStore), empty_remote(), false);

        let response = FetchOrderListResponse::page(
            descriptor(),
            vec![OrderListItem::new(1, "t2", OrderStatus::Finished)],
            false,
            false,
        );
        h.coordinator.reconcile(response).await;

        assert!(queued_fetches(&mut h.queue).is_empty());
        let event = reconciled(&mut h.list_events);
        assert!(event.ids.is_empty());
        assert_eq!(event.error.unwrap().kind, ErrorKind::GenericError);
    }

    #[tokio::test]
    async fn fetch_posts_page_back_to_queue() {
        let remote = StaticRemote {
            page: Ok(OrderListPage {
                items: vec![OrderListItem::new(4, "t1", OrderStatus::Receiving)],
                loaded_more: false,
                can_load_more: false,
            }),
        };
        let mut h = harness(Arc::new(InMemoryOrderStore::new()), remote, false);

        h.coordinator.fetch(descriptor(), 0);

        match h.queue.recv().await.unwrap() {
            Envelope::Internal(Command::FetchedOrderList(response)) => {
                assert_eq!(response.items.len(), 1);
                assert_eq!(response.generation, 0);
                assert!(response.error.is_none());
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_fetch_posts_error_response() {
        let remote = StaticRemote {
            page: Err(SyncError::from_code("Timeout", "took too long")),
        };
        let mut h = harness(Arc::new(InMemoryOrderStore::new()), remote, false);

        h.coordinator.fetch(descriptor(), 40);

        match h.queue.recv().await.unwrap() {
            Envelope::Internal(Command::FetchedOrderList(response)) => {
                assert!(response.loaded_more);
                assert!(!response.can_load_more);
                assert_eq!(response.error.unwrap().kind, ErrorKind::GenericError);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn superseded_pages_are_kept_by_default() {
        let mut h = harness(Arc::new(InMemoryOrderStore::new()), empty_remote(), false);
        h.coordinator.fetch(descriptor(), 0);
        h.coordinator.fetch(descriptor(), 0);

        let old = FetchOrderListResponse::page(descriptor(), vec![], false, false).with_generation(1);
        h.coordinator.reconcile(old).await;

        assert!(h.list_events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn generations_are_not_tracked_without_guard() {
        let mut h = harness(Arc::new(InMemoryOrderStore::new()), empty_remote(), false);
        for owner in 1..=50 {
            let descriptor = ListDescriptor::rest_owner(
                Owner::rest(owner),
                ListOrderBy::Date,
                ListOrder::Desc,
            );
            h.coordinator.fetch(descriptor, 0);
            h.coordinator.fetch(descriptor, 20);
        }

        assert!(h.coordinator.generations.is_empty());
    }

    #[tokio::test]
    async fn generations_are_tracked_with_guard() {
        let mut h = harness(Arc::new(InMemoryOrderStore::new()), empty_remote(), true);
        h.coordinator.fetch(descriptor(), 0);

        match h.queue.recv().await.unwrap() {
            Envelope::Internal(Command::FetchedOrderList(response)) => {
                assert_eq!(response.generation, 1);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
        assert_eq!(h.coordinator.generations.get(&descriptor()), Some(&1));
    }

    #[tokio::test]
    async fn superseded_pages_are_dropped_when_enabled() {
        let mut h = harness(Arc::new(InMemoryOrderStore::new()), empty_remote(), true);
        h.coordinator.fetch(descriptor(), 0);
        h.coordinator.fetch(descriptor(), 0);
        h.coordinator.fetch(descriptor(), 20);

        let old = FetchOrderListResponse::page(descriptor(), vec![], false, false).with_generation(1);
        h.coordinator.reconcile(old).await;
        assert!(h.list_events.try_recv().is_err());

        // Load-more pages share the current generation.
        let current =
            FetchOrderListResponse::page(descriptor(), vec![], true, false).with_generation(2);
        h.coordinator.reconcile(current).await;
        assert!(reconciled(&mut h.list_events).loaded_more);
    }
}
