//! Arc messaging - in-app "what's new" messages
//!
//! Fetches announcements from the remote feed, keeps them in a local SQLite
//! store and tracks which ones the user has read.
//!
//! ## Module Organization
//!
//! - `adapters/`: SQLite store and HTTP feed client
//! - `services/`: Sync service, background monitor, logging
//! - `dialog/`: View model of the "What's new" dialog
//! - `types/`: Data structures and errors
//! - `config/`: Configuration management

pub mod adapters;
pub mod config;
pub mod dialog;
pub mod services;
pub mod types;

pub use adapters::sqlite::{Store, StoreLocation};
pub use config::{AppConfig, MessagingConfig};
pub use dialog::{MessagesDialog, NavigationEvent};
pub use services::{MessagingMonitor, MessagingService, MonitorEvent};
pub use types::{Message, MessagingError, ReadState, Result, StoredMessage};
