//! WebSocket support for live order updates.
//!
//! Clients connect to `/events` and receive every change the sync worker
//! publishes: merged orders, reconciled list pages and partition changes.
//! They may also ask for a list page to be fetched over the same socket.

mod manager;
mod protocol;
mod relay;

pub use manager::ConnectionManager;
pub use protocol::*;
pub use relay::spawn_relay;
