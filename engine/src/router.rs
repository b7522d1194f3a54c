//! The sync worker.
//!
//! Every command is routed through one queue and handled by one task, in
//! the order it was queued. A handler never waits on the remote: remote
//! calls run as detached tasks and their results re-enter the queue as new
//! commands. Local store calls are awaited inline, so no two handlers ever
//! touch the store at the same time.

use crate::{
    collaborators::{ListConsumer, LocalStore, RemoteSource},
    command::{Command, Envelope, Loopback},
    coordinator::ListSyncCoordinator,
    error::{Error, Result},
    list::ListDescriptor,
    notifier::ChangeNotifier,
    order::{OrderRecord, Owner},
    syncer::SingleItemSyncer,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Worker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Drop list pages answering a fetch that a newer first-page fetch of the
    /// same descriptor has superseded.
    #[serde(default)]
    pub discard_superseded_pages: bool,
}

/// Collaborators the worker is wired to.
#[derive(Clone)]
pub struct SyncDeps {
    pub remote: Arc<dyn RemoteSource>,
    pub store: Arc<dyn LocalStore>,
    pub lists: Arc<dyn ListConsumer>,
    pub notifier: ChangeNotifier,
}

/// Sends [`HandlesDropped`](Envelope::HandlesDropped) when the last
/// dispatcher goes away.
#[derive(Debug)]
struct HandleGuard {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let _ = self.sender.send(Envelope::HandlesDropped);
    }
}

/// Cloneable handle for posting commands to the worker.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Envelope>,
    _guard: Arc<HandleGuard>,
}

impl Dispatcher {
    /// Queue a command.
    pub fn dispatch(&self, command: Command) -> Result<()> {
        self.sender
            .send(Envelope::External(command))
            .map_err(|_| Error::WorkerStopped)
    }

    /// Queue a list fetch.
    pub fn fetch_order_list(&self, descriptor: ListDescriptor, offset: u64) -> Result<()> {
        self.dispatch(Command::FetchOrderList { descriptor, offset })
    }

    /// Queue a single-order fetch.
    pub fn fetch_order(&self, order: OrderRecord, owner: Owner) -> Result<()> {
        self.dispatch(Command::FetchOrder { order, owner })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Routes commands to the list coordinator and the single-order syncer.
pub struct ActionRouter {
    receiver: mpsc::UnboundedReceiver<Envelope>,
    loopback: Loopback,
    coordinator: ListSyncCoordinator,
    syncer: SingleItemSyncer,
    handles_dropped: bool,
}

impl ActionRouter {
    /// Build a worker and the dispatcher that feeds it.
    pub fn new(deps: SyncDeps, config: SyncConfig) -> (Self, Dispatcher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let loopback = Loopback::new(sender.clone());

        let coordinator = ListSyncCoordinator::new(
            Arc::clone(&deps.remote),
            Arc::clone(&deps.store),
            Arc::clone(&deps.lists),
            loopback.clone(),
            config.discard_superseded_pages,
        );
        let syncer = SingleItemSyncer::new(
            deps.remote,
            deps.store,
            deps.lists,
            deps.notifier,
            loopback.clone(),
        );

        let dispatcher = Dispatcher {
            sender: sender.clone(),
            _guard: Arc::new(HandleGuard { sender }),
        };

        let router = Self {
            receiver,
            loopback,
            coordinator,
            syncer,
            handles_dropped: false,
        };
        (router, dispatcher)
    }

    /// Build a worker and run it on the current tokio runtime.
    pub fn spawn(deps: SyncDeps, config: SyncConfig) -> (Dispatcher, JoinHandle<()>) {
        let (router, dispatcher) = Self::new(deps, config);
        let handle = tokio::spawn(router.run());
        (dispatcher, handle)
    }

    /// Drain the queue until every dispatcher is gone and nothing the worker
    /// started is still queued or in flight.
    pub async fn run(mut self) {
        tracing::debug!("sync worker started");

        while let Some(envelope) = self.receiver.recv().await {
            match envelope {
                Envelope::External(command) => self.route(command).await,
                Envelope::Internal(command) => {
                    self.loopback.settle();
                    self.route(command).await;
                }
                Envelope::HandlesDropped => self.handles_dropped = true,
            }

            if self.handles_dropped && self.loopback.pending() == 0 {
                break;
            }
        }

        tracing::debug!("sync worker stopped");
    }

    async fn route(&mut self, command: Command) {
        tracing::trace!(command = command.name(), "routing command");

        match command {
            Command::FetchOrderList { descriptor, offset } => {
                self.coordinator.fetch(descriptor, offset)
            }
            Command::FetchedOrderList(response) => self.coordinator.reconcile(response).await,
            Command::FetchOrder { order, owner } => self.syncer.fetch_one(order, owner),
            Command::FetchedOrder(response) => self.syncer.complete(response).await,
        }
    }
}
