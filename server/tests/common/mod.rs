//! Shared fixtures for server integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use orderflux_engine::{OrderRecord, OrderStatus};
use orderflux_server::db::{self, Pool};
use serde_json::{json, Value};

/// Fresh in-memory database with migrations applied.
pub async fn memory_pool() -> Pool {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// A cached order as a local client would have stored it.
pub fn cached(remote_id: i64, owner: i64, modified: &str, status: OrderStatus) -> OrderRecord {
    OrderRecord::from_remote(remote_id, modified, status)
        .with_owner(owner)
        .with_date_created(format!("2024-01-{:02}", remote_id % 28 + 1))
        .with_payload(json!({"note": "cached"}))
}

/// In-process stand-in for the remote order API.
#[derive(Clone, Default)]
pub struct FakeApi {
    pub list: Arc<Mutex<Vec<Value>>>,
    pub raw_list: Arc<Mutex<Option<String>>>,
    pub orders: Arc<Mutex<HashMap<i64, Value>>>,
    pub list_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub order_hits: Arc<Mutex<Vec<i64>>>,
}

impl FakeApi {
    pub fn with_list(self, list: Vec<Value>) -> Self {
        *self.list.lock().unwrap() = list;
        self
    }

    pub fn with_order(self, order: Value) -> Self {
        let id = order["id"].as_i64().unwrap();
        self.orders.lock().unwrap().insert(id, order);
        self
    }

    pub fn with_raw_list(self, body: &str) -> Self {
        *self.raw_list.lock().unwrap() = Some(body.to_string());
        self
    }

    pub fn order_hits(&self) -> Vec<i64> {
        let mut hits = self.order_hits.lock().unwrap().clone();
        hits.sort();
        hits
    }

    pub fn last_list_query(&self) -> HashMap<String, String> {
        self.list_queries.lock().unwrap().last().cloned().unwrap()
    }

    /// Serve the fake API on an ephemeral port. Returns its base URL.
    pub async fn serve(self) -> String {
        let app = Router::new()
            .route("/owners/{owner}/orders", get(list_orders))
            .route("/owners/{owner}/orders/{id}", get(get_order))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }
}

async fn list_orders(
    State(api): State<FakeApi>,
    Path(_owner): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    api.list_queries.lock().unwrap().push(query);

    let raw = api.raw_list.lock().unwrap().clone();
    if let Some(body) = raw {
        return body.into_response();
    }
    let orders = api.list.lock().unwrap().clone();
    Json(json!({ "orders": orders })).into_response()
}

async fn get_order(State(api): State<FakeApi>, Path((_owner, id)): Path<(i64, i64)>) -> Response {
    api.order_hits.lock().unwrap().push(id);

    let order = api.orders.lock().unwrap().get(&id).cloned();
    match order {
        Some(order) => Json(order).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown_order", "message": "no such order"})),
        )
            .into_response(),
    }
}
