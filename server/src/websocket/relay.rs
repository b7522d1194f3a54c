//! Forwards engine notifications to connected WebSocket clients.

use std::sync::Arc;

use orderflux_engine::{ChangeEvent, ListEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::{ConnectionManager, ServerMessage};

/// Relay order changes and list events until both channels close.
pub fn spawn_relay(
    manager: Arc<ConnectionManager>,
    mut changes: broadcast::Receiver<ChangeEvent>,
    mut lists: broadcast::Receiver<ListEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes_open = true;
        let mut lists_open = true;

        while changes_open || lists_open {
            let message: Option<ServerMessage> = tokio::select! {
                received = changes.recv(), if changes_open => match received {
                    Ok(event) => Some(event.into()),
                    Err(err) => {
                        changes_open = keep_open(err, "order changes");
                        None
                    }
                },
                received = lists.recv(), if lists_open => match received {
                    Ok(event) => Some(event.into()),
                    Err(err) => {
                        lists_open = keep_open(err, "list events");
                        None
                    }
                },
            };

            if let Some(message) = message {
                manager.broadcast_all(message);
            }
        }

        tracing::debug!("event relay stopped");
    })
}

fn keep_open(err: RecvError, channel: &str) -> bool {
    match err {
        RecvError::Lagged(skipped) => {
            tracing::warn!(skipped, channel, "event relay lagged, events dropped");
            true
        }
        RecvError::Closed => false,
    }
}
