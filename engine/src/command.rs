//! Commands handled by the sync worker, and the loopback that posts
//! worker-originated commands back onto its queue.

use crate::{
    error::SyncError,
    list::ListDescriptor,
    order::{OrderListItem, OrderRecord, Owner},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result of a remote list fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOrderListResponse {
    pub descriptor: ListDescriptor,
    pub items: Vec<OrderListItem>,
    pub loaded_more: bool,
    pub can_load_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
    /// Fetch generation the page answers, see
    /// [`SyncConfig::discard_superseded_pages`](crate::SyncConfig)
    #[serde(default)]
    pub generation: u64,
}

impl FetchOrderListResponse {
    pub fn page(
        descriptor: ListDescriptor,
        items: Vec<OrderListItem>,
        loaded_more: bool,
        can_load_more: bool,
    ) -> Self {
        Self {
            descriptor,
            items,
            loaded_more,
            can_load_more,
            error: None,
            generation: 0,
        }
    }

    pub fn failed(descriptor: ListDescriptor, loaded_more: bool, error: SyncError) -> Self {
        Self {
            descriptor,
            items: Vec::new(),
            loaded_more,
            can_load_more: false,
            error: Some(error),
            generation: 0,
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

/// Result of a remote single-order fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOrderResponse {
    /// The fetched record, or the original one when the fetch failed
    pub order: OrderRecord,
    pub owner: Owner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
}

impl FetchOrderResponse {
    pub fn fetched(order: OrderRecord, owner: Owner) -> Self {
        Self {
            order,
            owner,
            error: None,
        }
    }

    pub fn failed(order: OrderRecord, owner: Owner, error: SyncError) -> Self {
        Self {
            order,
            owner,
            error: Some(error),
        }
    }
}

/// Everything the sync worker can be asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Request one page of a list from the remote.
    FetchOrderList {
        descriptor: ListDescriptor,
        offset: u64,
    },
    /// A list page arrived.
    FetchedOrderList(FetchOrderListResponse),
    /// Request the full remote version of one order.
    FetchOrder { order: OrderRecord, owner: Owner },
    /// A single order arrived.
    FetchedOrder(FetchOrderResponse),
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::FetchOrderList { .. } => "fetch_order_list",
            Command::FetchedOrderList(_) => "fetched_order_list",
            Command::FetchOrder { .. } => "fetch_order",
            Command::FetchedOrder(_) => "fetched_order",
        }
    }
}

/// What travels on the worker queue.
#[derive(Debug)]
pub(crate) enum Envelope {
    /// Posted by a [`Dispatcher`](crate::Dispatcher).
    External(Command),
    /// Posted by the worker itself or by one of its remote calls.
    Internal(Command),
    /// The last dispatcher went away.
    HandlesDropped,
}

/// Posts worker-originated commands back onto the worker queue.
///
/// Tracks how many of them are queued or still being produced, so the
/// worker knows when it has run dry.
#[derive(Debug, Clone)]
pub struct Loopback {
    sender: mpsc::UnboundedSender<Envelope>,
    pending: Arc<AtomicUsize>,
}

impl Loopback {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            sender,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a command behind everything already queued.
    pub(crate) fn post(&self, command: Command) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(Envelope::Internal(command)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("sync worker queue closed, dropping command");
        }
    }

    /// Run `call` off the worker and queue the command it resolves to.
    ///
    /// If `call` panics, the command built by `recover` is queued instead, so
    /// the failure still reaches the worker and the pending count settles.
    pub(crate) fn spawn<F, R>(&self, call: F, recover: R)
    where
        F: Future<Output = Command> + Send + 'static,
        R: FnOnce(SyncError) -> Command + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let sender = self.sender.clone();
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            let command = match tokio::spawn(call).await {
                Ok(command) => command,
                Err(err) => {
                    tracing::error!(error = %err, "remote call did not complete");
                    recover(SyncError::generic("remote call panicked"))
                }
            };
            if sender.send(Envelope::Internal(command)).is_err() {
                pending.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!("sync worker queue closed, dropping remote result");
            }
        });
    }

    /// Mark one internal command as received.
    pub(crate) fn settle(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Internal commands queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
