//! Request handlers for list and order operations.

mod lists;
mod orders;
mod websocket;

pub use lists::*;
pub use orders::*;
pub use websocket::{handle_websocket_connection, process_message};
