//! Orderflux Server - keeps a SQLite order cache in step with a remote
//! REST order API.
//!
//! The server owns one sync worker from `orderflux-engine`. HTTP routes queue
//! list and order fetches on it and read the cache; a WebSocket stream
//! publishes every change the worker makes.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod remote;
pub mod routes;
pub mod websocket;

use std::sync::Arc;

use axum::Router;
use orderflux_engine::{
    ActionRouter, BroadcastListConsumer, ChangeNotifier, Dispatcher, RemoteSource, SyncConfig,
    SyncDeps,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::SqliteOrderStore;
use crate::websocket::{spawn_relay, ConnectionManager};

/// Events buffered per subscriber before slow WebSocket relays start lagging.
const EVENT_CAPACITY: usize = 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteOrderStore,
    pub dispatcher: Dispatcher,
    pub conn_manager: Arc<ConnectionManager>,
}

/// The running background tasks behind an [`AppState`].
pub struct Services {
    pub state: AppState,
    /// The sync worker; finishes once every dispatcher is dropped
    pub worker: JoinHandle<()>,
    /// Forwards worker events to WebSocket clients; finishes after the worker
    pub relay: JoinHandle<()>,
}

/// Start the sync worker and the event relay on the current runtime.
pub fn start(
    store: SqliteOrderStore,
    remote: Arc<dyn RemoteSource>,
    config: SyncConfig,
) -> Services {
    let notifier = ChangeNotifier::new(EVENT_CAPACITY);
    let lists = Arc::new(BroadcastListConsumer::new(EVENT_CAPACITY));
    let conn_manager = ConnectionManager::new_shared();

    let relay = spawn_relay(conn_manager.clone(), notifier.subscribe(), lists.subscribe());

    let deps = SyncDeps {
        remote,
        store: Arc::new(store.clone()),
        lists,
        notifier,
    };
    let (dispatcher, worker) = ActionRouter::spawn(deps, config);

    Services {
        state: AppState {
            store,
            dispatcher,
            conn_manager,
        },
        worker,
        relay,
    }
}

/// Build the HTTP application.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
