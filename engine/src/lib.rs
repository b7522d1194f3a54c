//! # Orderflux Engine
//!
//! Reconciliation engine that keeps a locally cached set of orders in step
//! with a remote source of truth.
//!
//! The remote exposes a cheap paginated listing (id, last-modified marker and
//! status per order) and an expensive per-order fetch. The engine diffs each
//! listing page against the local cache and fetches full records only for the
//! orders whose fingerprint changed.
//!
//! ## Design Principles
//!
//! - **No IO**: network and storage are reached only through the
//!   [`RemoteSource`], [`LocalStore`] and [`ListConsumer`] traits
//! - **Single consumer**: every command is handled by one worker, in order
//! - **Refresh, never create**: a listing page only refreshes orders that
//!   already exist locally
//! - **Remote wins**: a merge overwrites every mutable field with the remote value
//!
//! ## Core Concepts
//!
//! ### Fingerprints
//!
//! A [`Fingerprint`] is the `(last_modified, status)` pair. An order is stale
//! when its local fingerprint differs from the one in the listing, see
//! [`is_stale`].
//!
//! ### Commands
//!
//! Work reaches the engine as [`Command`]s posted through a [`Dispatcher`].
//! Remote calls run as detached tasks whose results come back as new
//! commands, so the worker never waits on the network.
//!
//! ### Notifications
//!
//! Merges publish [`ChangeEvent`]s through the [`ChangeNotifier`]. List
//! consumers receive one [`ListReconciled`] per page and a
//! [`PartitionKey`] whenever an owner's orders change.
//!
//! ## Quick Start
//!
//! ```rust
//! use orderflux_engine::{
//!     ActionRouter, BroadcastListConsumer, ChangeNotifier, InMemoryOrderStore, ListDescriptor,
//!     ListOrder, ListOrderBy, OrderListPage, OrderRecord, Owner, RemoteSource, SyncConfig,
//!     SyncDeps, SyncError,
//! };
//! use std::sync::Arc;
//!
//! struct Offline;
//!
//! #[async_trait::async_trait]
//! impl RemoteSource for Offline {
//!     async fn fetch_order_list(
//!         &self,
//!         _descriptor: &ListDescriptor,
//!         _offset: u64,
//!     ) -> Result<OrderListPage, SyncError> {
//!         Err(SyncError::generic("offline"))
//!     }
//!
//!     async fn fetch_order(
//!         &self,
//!         _order: &OrderRecord,
//!         _owner: &Owner,
//!     ) -> Result<OrderRecord, SyncError> {
//!         Err(SyncError::generic("offline"))
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let lists = Arc::new(BroadcastListConsumer::new(16));
//! let mut list_events = lists.subscribe();
//!
//! let deps = SyncDeps {
//!     remote: Arc::new(Offline),
//!     store: Arc::new(InMemoryOrderStore::new()),
//!     lists,
//!     notifier: ChangeNotifier::new(16),
//! };
//! let (dispatcher, worker) = ActionRouter::spawn(deps, SyncConfig::default());
//!
//! let descriptor = ListDescriptor::rest_owner(Owner::rest(7), ListOrderBy::Date, ListOrder::Desc);
//! dispatcher.fetch_order_list(descriptor, 0).unwrap();
//!
//! drop(dispatcher);
//! worker.await.unwrap();
//!
//! // The failed page still produces an (empty) reconciled event.
//! assert!(list_events.try_recv().is_ok());
//! # });
//! ```

pub mod collaborators;
pub mod command;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod list;
pub mod memory;
pub mod notifier;
pub mod order;
pub mod reconcile;
pub mod router;
pub mod syncer;

// Re-export main types at crate root
pub use collaborators::{ListConsumer, LocalStore, OrderListPage, RemoteSource};
pub use command::{Command, FetchOrderListResponse, FetchOrderResponse};
pub use coordinator::ListSyncCoordinator;
pub use detector::{is_stale, Fingerprint};
pub use error::{Error, ErrorKind, SyncError};
pub use list::{ListDescriptor, ListKind, ListOrder, ListOrderBy, ListReconciled, PartitionKey};
pub use memory::InMemoryOrderStore;
pub use notifier::{BroadcastListConsumer, ChangeCause, ChangeEvent, ChangeNotifier, ListEvent};
pub use order::{
    LocalOrRemoteId, OrderListItem, OrderRecord, OrderStatus, Owner, DEFAULT_ORDER_STATUS_LIST,
};
pub use reconcile::{plan_page, PagePlan};
pub use router::{ActionRouter, Dispatcher, SyncConfig, SyncDeps};
pub use syncer::SingleItemSyncer;

/// Type aliases for clarity
pub type LocalId = i64;
pub type RemoteId = i64;
pub type OwnerId = i64;
