//! Single-order synchronization: fetch one full record and merge it into
//! the local cache.

use crate::{
    collaborators::{ListConsumer, LocalStore, RemoteSource},
    command::{Command, FetchOrderResponse, Loopback},
    error::SyncError,
    list::PartitionKey,
    notifier::{ChangeEvent, ChangeNotifier},
    order::{OrderRecord, Owner},
};
use std::sync::Arc;

/// Fetches and merges individual orders.
pub struct SingleItemSyncer {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    lists: Arc<dyn ListConsumer>,
    notifier: ChangeNotifier,
    loopback: Loopback,
}

impl SingleItemSyncer {
    pub(crate) fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        lists: Arc<dyn ListConsumer>,
        notifier: ChangeNotifier,
        loopback: Loopback,
    ) -> Self {
        Self {
            remote,
            store,
            lists,
            notifier,
            loopback,
        }
    }

    /// Ask the remote for the full version of `order`.
    ///
    /// Only owners served by the REST API can be fetched; anything else is
    /// ignored. The result comes back as a [`Command::FetchedOrder`].
    pub fn fetch_one(&self, order: OrderRecord, owner: Owner) {
        if !owner.uses_rest_api {
            tracing::debug!(owner = owner.id, "owner not on the REST API, skipping order fetch");
            return;
        }

        tracing::debug!(
            owner = owner.id,
            local_id = order.local_id,
            remote_id = ?order.remote_id,
            "fetching order"
        );

        let remote = Arc::clone(&self.remote);
        let fallback = order.clone();
        self.loopback.spawn(
            async move {
                let response = match remote.fetch_order(&order, &owner).await {
                    Ok(mut fetched) => {
                        fetched.adopt_local_identity(&order);
                        FetchOrderResponse::fetched(fetched, owner)
                    }
                    Err(error) => FetchOrderResponse::failed(order, owner, error),
                };
                Command::FetchedOrder(response)
            },
            move |error| Command::FetchedOrder(FetchOrderResponse::failed(fallback, owner, error)),
        );
    }

    /// Merge a fetched order, or report why it could not be fetched.
    pub async fn complete(&self, response: FetchOrderResponse) {
        let FetchOrderResponse { order, error, .. } = response;

        if let Some(error) = error {
            tracing::warn!(
                local_id = order.local_id,
                remote_id = ?order.remote_id,
                %error,
                "order fetch failed"
            );
            self.notifier
                .emit(ChangeEvent::updated(order.local_id, order.remote_id, 0).with_error(error));
            return;
        }

        self.merge(order).await;
    }

    /// Overwrite the local record with the remote one. Remote wins on every
    /// mutable field.
    async fn merge(&self, order: OrderRecord) {
        let event = ChangeEvent::updated(order.local_id, order.remote_id, 0);

        let rows_affected = match self.store.overwrite_upsert(&order).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::error!(local_id = order.local_id, error = %err, "order merge failed");
                self.notifier.emit(event.with_error(SyncError::from(err)));
                return;
            }
        };

        tracing::debug!(
            local_id = order.local_id,
            remote_id = ?order.remote_id,
            rows_affected,
            "merged order"
        );

        self.notifier.emit(ChangeEvent {
            rows_affected,
            ..event
        });
        self.lists
            .on_list_partition_changed(PartitionKey::owner_orders(order.owner_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Envelope;
    use crate::{
        BroadcastListConsumer, ChangeCause, Error, ErrorKind, InMemoryOrderStore,
        ListDescriptor, ListEvent, LocalId, LocalOrRemoteId, OrderListPage, OrderStatus,
        OwnerId, RemoteId,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::{broadcast, mpsc};

    /// Answers every order fetch with a fixed remote version.
    struct FixedRemote {
        answer: std::result::Result<OrderRecord, SyncError>,
    }

    #[async_trait]
    impl RemoteSource for FixedRemote {
        async fn fetch_order_list(
            &self,
            _descriptor: &ListDescriptor,
            _offset: u64,
        ) -> std::result::Result<OrderListPage, SyncError> {
            Ok(OrderListPage::default())
        }

        async fn fetch_order(
            &self,
            _order: &OrderRecord,
            _owner: &Owner,
        ) -> std::result::Result<OrderRecord, SyncError> {
            self.answer.clone()
        }
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl LocalStore for ReadOnlyStore {
        async fn orders_by_remote_ids(
            &self,
            _remote_ids: &[RemoteId],
            _owner: OwnerId,
        ) -> crate::error::Result<HashMap<RemoteId, OrderRecord>> {
            Ok(HashMap::new())
        }

        async fn overwrite_upsert(&self, _order: &OrderRecord) -> crate::error::Result<u64> {
            Err(Error::Store("attempt to write a readonly database".into()))
        }

        async fn orders_by_local_or_remote_ids(
            &self,
            _ids: &[LocalOrRemoteId],
            _owner: OwnerId,
        ) -> crate::error::Result<Vec<OrderRecord>> {
            Ok(Vec::new())
        }

        async fn local_ids_for_descriptor(
            &self,
            _descriptor: &ListDescriptor,
        ) -> crate::error::Result<Vec<LocalId>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        syncer: SingleItemSyncer,
        queue: mpsc::UnboundedReceiver<Envelope>,
        changes: broadcast::Receiver<ChangeEvent>,
        list_events: broadcast::Receiver<ListEvent>,
    }

    fn harness(remote: FixedRemote, store: Arc<dyn LocalStore>) -> Harness {
        let (tx, queue) = mpsc::unbounded_channel();
        let notifier = ChangeNotifier::new(16);
        let changes = notifier.subscribe();
        let lists = Arc::new(BroadcastListConsumer::new(16));
        let list_events = lists.subscribe();
        let syncer =
            SingleItemSyncer::new(Arc::new(remote), store, lists, notifier, Loopback::new(tx));
        Harness {
            syncer,
            queue,
            changes,
            list_events,
        }
    }

    fn local_order() -> OrderRecord {
        let mut order = OrderRecord::from_remote(100, "t1", OrderStatus::Delivering)
            .with_local_id(1)
            .with_owner(7)
            .with_payload(json!({"note": "edited offline"}));
        order.is_locally_changed = true;
        order
    }

    fn remote_order() -> OrderRecord {
        OrderRecord::from_remote(100, "t2", OrderStatus::Finished)
            .with_payload(json!({"note": "from server"}))
    }

    #[tokio::test]
    async fn fetch_one_adopts_local_identity() {
        let mut h = harness(
            FixedRemote {
                answer: Ok(remote_order()),
            },
            Arc::new(InMemoryOrderStore::new()),
        );

        h.syncer.fetch_one(local_order(), Owner::rest(7));

        match h.queue.recv().await.unwrap() {
            Envelope::Internal(Command::FetchedOrder(response)) => {
                assert!(response.error.is_none());
                assert_eq!(response.order.local_id, 1);
                assert_eq!(response.order.owner_id, 7);
                assert_eq!(response.order.last_modified, "t2");
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_one_skips_owners_off_the_rest_api() {
        let h = harness(
            FixedRemote {
                answer: Ok(remote_order()),
            },
            Arc::new(InMemoryOrderStore::new()),
        );

        let owner = Owner {
            id: 7,
            uses_rest_api: false,
        };
        h.syncer.fetch_one(local_order(), owner);

        assert_eq!(h.syncer.loopback.pending(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_original_order() {
        let mut h = harness(
            FixedRemote {
                answer: Err(SyncError::unknown_order("deleted upstream")),
            },
            Arc::new(InMemoryOrderStore::new()),
        );

        h.syncer.fetch_one(local_order(), Owner::rest(7));

        match h.queue.recv().await.unwrap() {
            Envelope::Internal(Command::FetchedOrder(response)) => {
                assert_eq!(response.order, local_order());
                assert_eq!(response.error.unwrap().kind, ErrorKind::UnknownOrder);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_merges_with_remote_winning() {
        let store = Arc::new(InMemoryOrderStore::with_orders(vec![local_order()]));
        let mut h = harness(
            FixedRemote {
                answer: Ok(remote_order()),
            },
            store.clone(),
        );

        let mut fetched = remote_order();
        fetched.adopt_local_identity(&local_order());
        h.syncer
            .complete(FetchOrderResponse::fetched(fetched, Owner::rest(7)))
            .await;

        let stored = store.get(1).await.unwrap();
        assert_eq!(stored.last_modified, "t2");
        assert_eq!(stored.status, OrderStatus::Finished);
        assert_eq!(stored.payload, json!({"note": "from server"}));
        assert!(!stored.is_locally_changed);

        let event = h.changes.try_recv().unwrap();
        assert_eq!(
            event.cause,
            ChangeCause::RecordUpdated {
                local_id: 1,
                remote_id: Some(100)
            }
        );
        assert_eq!(event.rows_affected, 1);
        assert!(event.error.is_none());

        assert_eq!(
            h.list_events.try_recv().unwrap(),
            ListEvent::PartitionChanged {
                key: PartitionKey::owner_orders(7)
            }
        );
    }

    #[tokio::test]
    async fn complete_with_error_leaves_store_untouched() {
        let store = Arc::new(InMemoryOrderStore::with_orders(vec![local_order()]));
        let mut h = harness(
            FixedRemote {
                answer: Ok(remote_order()),
            },
            store.clone(),
        );

        h.syncer
            .complete(FetchOrderResponse::failed(
                local_order(),
                Owner::rest(7),
                SyncError::invalid_response("truncated body"),
            ))
            .await;

        assert_eq!(store.get(1).await.unwrap(), local_order());

        let event = h.changes.try_recv().unwrap();
        assert_eq!(event.rows_affected, 0);
        assert_eq!(event.error.unwrap().kind, ErrorKind::InvalidResponse);
        assert!(h.list_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_change_error() {
        let mut h = harness(
            FixedRemote {
                answer: Ok(remote_order()),
            },
            Arc::new(ReadOnlyStore),
        );

        let mut fetched = remote_order();
        fetched.adopt_local_identity(&local_order());
        h.syncer
            .complete(FetchOrderResponse::fetched(fetched, Owner::rest(7)))
            .await;

        let event = h.changes.try_recv().unwrap();
        assert_eq!(event.rows_affected, 0);
        assert_eq!(event.error.unwrap().kind, ErrorKind::GenericError);
        assert!(h.list_events.try_recv().is_err());
    }
}
