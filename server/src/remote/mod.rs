//! REST client for the remote order API.
//!
//! Implements the engine's [`RemoteSource`] over two endpoints: a cheap
//! listing of `(id, modified, status)` summaries per owner, and a per-order
//! fetch returning the full object.

mod wire;

pub use wire::*;

use std::time::Duration;

use async_trait::async_trait;
use orderflux_engine::{ListDescriptor, OrderListPage, OrderRecord, Owner, RemoteSource, SyncError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::config::Config;

/// Default timeout for remote requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the remote order API.
#[derive(Debug, Clone)]
pub struct RestRemoteSource {
    client: reqwest::Client,
    base_url: String,
    page_size: u64,
}

impl RestRemoteSource {
    /// Create a client for `base_url`, authenticating with `token` if given.
    pub fn new(base_url: &str, token: Option<&str>, page_size: u64) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            } else {
                tracing::warn!("REMOTE_API_TOKEN is not a valid header value, sending no auth");
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
        })
    }

    /// Create a client from server configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.remote_base_url,
            config.remote_api_token.as_deref(),
            config.page_size,
        )
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    fn list_url(&self, owner: &Owner) -> String {
        format!("{}/owners/{}/orders", self.base_url, owner.id)
    }

    fn order_url(&self, owner: &Owner, remote_id: i64) -> String {
        format!("{}/owners/{}/orders/{}", self.base_url, owner.id, remote_id)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            tracing::debug!(%status, "remote response");
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        tracing::debug!(%status, body = %preview, "remote error response");
    }

    /// Send a request and decode its body.
    async fn execute<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("remote request failed: {}", e);
            SyncError::generic(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::generic(e.to_string()))?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(decode_error(status.as_u16(), &body));
        }
        decode_body(&body)
    }
}

#[async_trait]
impl RemoteSource for RestRemoteSource {
    async fn fetch_order_list(
        &self,
        descriptor: &ListDescriptor,
        offset: u64,
    ) -> Result<OrderListPage, SyncError> {
        let request = match descriptor {
            ListDescriptor::RestOwner {
                owner,
                order_by,
                order,
            } => self.client.get(self.list_url(owner)).query(&[
                ("offset", offset.to_string()),
                ("number", self.page_size.to_string()),
                ("order_by", order_by.as_str().to_string()),
                ("order", order.as_str().to_string()),
                ("fields", LIST_FIELDS.to_string()),
            ]),
        };

        let body: OrderListBody = Self::execute(request).await?;
        // Skipped items still count towards a full page.
        let can_load_more = body.orders.len() as u64 == self.page_size;
        let items = body.into_items();

        Ok(OrderListPage {
            items,
            loaded_more: offset > 0,
            can_load_more,
        })
    }

    async fn fetch_order(
        &self,
        order: &OrderRecord,
        owner: &Owner,
    ) -> Result<OrderRecord, SyncError> {
        let Some(remote_id) = order.remote_id else {
            return Err(SyncError::unknown_order(format!(
                "order {} has no remote id",
                order.local_id
            )));
        };

        let request = self.client.get(self.order_url(owner, remote_id));
        let wire: WireOrder = Self::execute(request).await?;
        Ok(wire.into())
    }
}
