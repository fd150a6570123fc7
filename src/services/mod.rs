pub mod logger;
pub mod messaging_service;
pub mod monitor;

pub use messaging_service::MessagingService;
pub use monitor::{MessagingMonitor, MonitorEvent};
