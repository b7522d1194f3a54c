//! JSON bodies exchanged with the remote order API.

use orderflux_engine::{OrderListItem, OrderRecord, OrderStatus, SyncError};
use serde::Deserialize;

/// Fields requested for listing pages.
pub const LIST_FIELDS: &str = "id,modified,status";

/// Body of a listing page.
#[derive(Debug, Deserialize)]
pub struct OrderListBody {
    #[serde(default)]
    pub orders: Vec<WireListItem>,
}

impl OrderListBody {
    /// Summaries the engine can reconcile. Items with a status this client
    /// does not know are skipped so the rest of the page still syncs.
    pub fn into_items(self) -> Vec<OrderListItem> {
        self.orders
            .into_iter()
            .filter_map(|item| match OrderStatus::parse(&item.status) {
                Some(status) => Some(OrderListItem::new(item.id, item.modified, status)),
                None => {
                    tracing::warn!(
                        remote_id = item.id,
                        status = %item.status,
                        "skipping listed order with unknown status"
                    );
                    None
                }
            })
            .collect()
    }
}

/// One summary in a listing page.
#[derive(Debug, Deserialize)]
pub struct WireListItem {
    pub id: i64,
    pub modified: String,
    pub status: String,
}

/// A full order. Fields the engine does not interpret are kept as payload.
#[derive(Debug, Deserialize)]
pub struct WireOrder {
    pub id: i64,
    pub modified: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub date_created: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl From<WireOrder> for OrderRecord {
    fn from(order: WireOrder) -> Self {
        OrderRecord::from_remote(order.id, order.modified, order.status)
            .with_date_created(order.date_created)
            .with_payload(serde_json::Value::Object(order.rest))
    }
}

/// Error body returned with a non-success status.
#[derive(Debug, Default, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decode an error body. Unknown or missing codes become `GENERIC_ERROR`,
/// and an unreadable body falls back to the HTTP status text.
pub fn decode_error(status: u16, body: &str) -> SyncError {
    let wire: WireError = serde_json::from_str(body).unwrap_or_default();
    let message = wire
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("remote answered with status {status}"));

    SyncError::from_code(wire.error.as_deref().unwrap_or_default(), message)
}

/// Decode a success body, mapping parse failures to `INVALID_RESPONSE`.
pub fn decode_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SyncError> {
    serde_json::from_str(body)
        .map_err(|e| SyncError::invalid_response(format!("failed to parse response: {e}")))
}
