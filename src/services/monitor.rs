//! Background polling of the messages feed
//!
//! Calls [`MessagingService::run`] on a fixed interval and publishes the
//! outcome on a flume channel. The first tick fires immediately; the
//! service's own freshness check keeps repeated ticks off the network.

use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::messaging_service::MessagingService;

/// Monitor notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// A sync pass finished with this many unread messages
    UnreadCount(usize),
    /// A sync pass failed; the monitor keeps running
    SyncFailed(String),
    /// Monitor is stopping
    Shutdown,
}

pub struct MessagingMonitor {
    service: Arc<MessagingService>,
    interval: Duration,
    running: Arc<AtomicBool>,
    event_tx: Sender<MonitorEvent>,
}

impl MessagingMonitor {
    pub fn new(service: Arc<MessagingService>, interval: Duration) -> (Self, Receiver<MonitorEvent>) {
        let (tx, rx) = flume::unbounded();

        let monitor = Self {
            service,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            event_tx: tx,
        };

        (monitor, rx)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark monitor as running (call before spawning the monitor task)
    pub fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        info!("Stopping messages monitor");
        self.running.store(false, Ordering::SeqCst);
        let _ = self.event_tx.send(MonitorEvent::Shutdown);
    }

    /// Run the poll loop until [`stop`](Self::stop) is called.
    ///
    /// The running flag is not set here: call [`mark_running`](Self::mark_running)
    /// before spawning, so a `stop()` issued before the task starts is kept.
    pub async fn start(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        info!("Starting messages monitor (interval: {:?})", self.interval);

        let mut polls = 0u64;
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            polls += 1;
            debug!("Messages poll #{}", polls);

            let event = match self.service.run().await {
                Ok(unread) => MonitorEvent::UnreadCount(unread),
                Err(e) => {
                    warn!("Messages sync failed: {}", e);
                    MonitorEvent::SyncFailed(e.to_string())
                }
            };

            if let Err(e) = self.event_tx.send(event) {
                error!("Failed to publish monitor event: {}", e);
                break;
            }
        }

        info!("Messages monitor stopped after {} polls", polls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::Store;
    use crate::config::MessagingConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(endpoint: String, platform: Option<&str>) -> Arc<MessagingService> {
        let mut config = MessagingConfig::default();
        config.endpoint = endpoint;
        config.platform = platform.map(str::to_string);
        Arc::new(MessagingService::new(config, Arc::new(Store::in_memory())).unwrap())
    }

    #[tokio::test]
    async fn test_publishes_unread_count_then_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "a", "time": 1 },
                    { "id": "b", "time": 2 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(format!("{}/v1/messages", server.uri()), Some("chrome"));
        let (monitor, rx) = MessagingMonitor::new(service, Duration::from_millis(20));
        let monitor = Arc::new(monitor);

        monitor.mark_running();
        let task = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.start().await })
        };

        assert_eq!(rx.recv_async().await.unwrap(), MonitorEvent::UnreadCount(2));
        // Later ticks hit the freshness check, not the server
        assert_eq!(rx.recv_async().await.unwrap(), MonitorEvent::UnreadCount(2));

        monitor.stop();
        assert!(!monitor.is_running());
        task.await.unwrap();

        let rest: Vec<MonitorEvent> = rx.drain().collect();
        assert!(rest.contains(&MonitorEvent::Shutdown));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let service = service("http://localhost/v1/messages".to_string(), None);
        let (monitor, rx) = MessagingMonitor::new(service, Duration::from_millis(10));
        let monitor = Arc::new(monitor);

        monitor.mark_running();
        let task = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.start().await })
        };

        for _ in 0..2 {
            let event = rx.recv_async().await.unwrap();
            assert!(matches!(event, MonitorEvent::SyncFailed(_)));
        }
        assert!(monitor.is_running());

        monitor.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_task_runs_is_kept() {
        let service = service("http://localhost/v1/messages".to_string(), None);
        let (monitor, rx) = MessagingMonitor::new(service, Duration::from_millis(10));
        let monitor = Arc::new(monitor);

        monitor.mark_running();
        let task = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.start().await })
        };
        monitor.stop();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor loop should exit after stop")
            .unwrap();

        assert!(!monitor.is_running());
        let events: Vec<MonitorEvent> = rx.drain().collect();
        assert_eq!(events, vec![MonitorEvent::Shutdown]);
    }
}
