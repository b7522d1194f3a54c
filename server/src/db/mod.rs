//! Database module for SQLite persistence of the order cache.

mod orders;
mod pool;
mod store;

pub use orders::*;
pub use pool::*;
pub use store::SqliteOrderStore;
