//! Change notification fan-out.
//!
//! Both notifiers broadcast: every subscriber gets every event, and emitting
//! with nobody listening is not an error. Slow subscribers lag and lose the
//! oldest events, as with any [`tokio::sync::broadcast`] channel.

use crate::{
    collaborators::ListConsumer,
    error::SyncError,
    list::{ListReconciled, PartitionKey},
    LocalId, RemoteId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why an order changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeCause {
    #[serde(rename_all = "camelCase")]
    RecordUpdated {
        local_id: LocalId,
        remote_id: Option<RemoteId>,
    },
}

/// Published after every single-order merge attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub cause: ChangeCause,
    pub rows_affected: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
}

impl ChangeEvent {
    pub fn updated(local_id: LocalId, remote_id: Option<RemoteId>, rows_affected: u64) -> Self {
        Self {
            cause: ChangeCause::RecordUpdated {
                local_id,
                remote_id,
            },
            rows_affected,
            error: None,
        }
    }

    pub fn with_error(mut self, error: SyncError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Publishes [`ChangeEvent`]s to subscribers.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn emit(&self, event: ChangeEvent) -> usize {
        tracing::debug!(
            cause = ?event.cause,
            rows_affected = event.rows_affected,
            error = event.error.is_some(),
            "order changed"
        );
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// List-level notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEvent {
    Reconciled(ListReconciled),
    PartitionChanged { key: PartitionKey },
}

/// A [`ListConsumer`] that rebroadcasts to any number of subscribers.
#[derive(Debug)]
pub struct BroadcastListConsumer {
    sender: broadcast::Sender<ListEvent>,
}

impl BroadcastListConsumer {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: ListEvent) {
        // No receivers is fine: nobody is showing a list right now.
        let _ = self.sender.send(event);
    }
}

impl ListConsumer for BroadcastListConsumer {
    fn on_list_reconciled(&self, event: ListReconciled) {
        self.publish(ListEvent::Reconciled(event));
    }

    fn on_list_partition_changed(&self, key: PartitionKey) {
        self.publish(ListEvent::PartitionChanged { key });
    }
}
