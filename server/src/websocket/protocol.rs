//! WebSocket message protocol definitions.
//!
//! All messages are JSON objects tagged by a snake_case `type` field.

use orderflux_engine::{ChangeEvent, ListDescriptor, ListEvent, ListReconciled, PartitionKey};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Fetch one page of a remote order list.
    FetchList {
        descriptor: ListDescriptor,
        #[serde(default)]
        offset: u64,
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A single order was merged, or failed to be.
    OrderChanged(ChangeEvent),

    /// A list page was reconciled against the local cache.
    ListReconciled(ListReconciled),

    /// Cached orders of a partition changed; lists over it should reload.
    ListPartitionChanged { key: PartitionKey },

    /// A fetch request was queued.
    Accepted {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }
}

impl From<ChangeEvent> for ServerMessage {
    fn from(event: ChangeEvent) -> Self {
        ServerMessage::OrderChanged(event)
    }
}

impl From<ListEvent> for ServerMessage {
    fn from(event: ListEvent) -> Self {
        match event {
            ListEvent::Reconciled(reconciled) => ServerMessage::ListReconciled(reconciled),
            ListEvent::PartitionChanged { key } => ServerMessage::ListPartitionChanged { key },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflux_engine::{ListOrder, ListOrderBy, Owner, SyncError};
    use serde_json::{json, Value};

    #[test]
    fn test_client_message_deserialization() {
        let json = r#"{
            "type": "fetch_list",
            "descriptor": {"type": "restOwner", "owner": {"id": 7, "usesRestApi": true}, "orderBy": "date", "order": "desc"},
            "offset": 20,
            "request_id": "req-1"
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::FetchList {
                descriptor,
                offset,
                request_id,
            } => {
                assert_eq!(descriptor.owner().id, 7);
                assert_eq!(offset, 20);
                assert_eq!(request_id, Some("req-1".to_string()));
            }
            _ => panic!("Expected FetchList message"),
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_server_message_serialization() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let msg = ServerMessage::error("test error", Some("req-1".to_string()));
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "message": "test error", "request_id": "req-1"})
        );
    }

    #[test]
    fn test_order_changed_flattens_event() {
        let event = ChangeEvent::updated(3, Some(30), 0).with_error(SyncError::unknown_order("gone"));
        let value = serde_json::to_value(ServerMessage::from(event)).unwrap();

        assert_eq!(value["type"], "order_changed");
        assert_eq!(value["rowsAffected"], 0);
        assert_eq!(value["cause"]["localId"], 3);
        assert_eq!(value["error"]["kind"], "UNKNOWN_ORDER");
    }

    #[test]
    fn test_list_events_map_to_messages() {
        let descriptor =
            ListDescriptor::rest_owner(Owner::rest(7), ListOrderBy::Id, ListOrder::Asc);
        let reconciled = ListReconciled {
            descriptor,
            ids: vec![1, 2],
            loaded_more: false,
            can_load_more: true,
            error: None,
        };

        let value = serde_json::to_value(ServerMessage::from(ListEvent::Reconciled(reconciled)))
            .unwrap();
        assert_eq!(value["type"], "list_reconciled");
        assert_eq!(value["ids"], json!([1, 2]));
        assert_eq!(value["canLoadMore"], true);

        let msg = ServerMessage::from(ListEvent::PartitionChanged {
            key: PartitionKey::owner_orders(7),
        });
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["type"], "list_partition_changed");
        assert_eq!(value["key"]["owner"], 7);
    }
}
