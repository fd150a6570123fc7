pub mod connection;
pub mod pool;
pub mod schema;
pub mod store;

// Re-export the commonly used types so callers can do
// `use crate::adapters::sqlite::Store` instead of the full path.
pub use connection::ConnectionStatus;
pub use pool::{DbPool, StoreLocation};
pub use schema::{MESSAGES, META};
pub use store::{IndexQuery, Store};
