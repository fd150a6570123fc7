//! "What's new" synchronization
//!
//! Reconciles the remote message feed with the local store:
//! 1. Skip the network while the last checkpoint is younger than the refresh interval
//! 2. Fetch new messages for this platform and channel (delta when a checkpoint exists)
//! 3. Advance the checkpoint
//! 4. Insert messages whose ids are not stored yet, as unread
//! 5. Report the unread count

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::adapters::feed::FeedClient;
use crate::adapters::sqlite::{IndexQuery, Store, MESSAGES, META};
use crate::config::MessagingConfig;
use crate::services::logger::fmt_ms;
use crate::types::error::{MessagingError, Result};
use crate::types::{Message, MessagesResponse, ReadState, StoredMessage};

/// Meta key of the last successful sync checkpoint
pub const UPDATE_TIME_KEY: &str = "updateTime";

pub struct MessagingService {
    config: MessagingConfig,
    store: Arc<Store>,
    feed: FeedClient,
}

impl MessagingService {
    pub fn new(config: MessagingConfig, store: Arc<Store>) -> Result<Self> {
        let feed = FeedClient::new(config.request_timeout())?;
        Ok(Self {
            config,
            store,
            feed,
        })
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Sync with the remote feed when due and return the unread count.
    pub async fn run(&self) -> Result<usize> {
        let started = Instant::now();
        let last_checked = self.last_checked().await?;
        let now = now_millis();

        let elapsed = now.saturating_sub(last_checked);
        if last_checked != 0 && elapsed < self.refresh_interval_ms() {
            debug!("Messages checked {}ms ago, skipping fetch", elapsed);
            return self.count_unread().await;
        }

        let url = self.build_url(last_checked, now).ok_or_else(|| {
            MessagingError::Config("Messaging platform is not configured".to_string())
        })?;

        let response = match self.feed.get_messages(&url).await? {
            Some(response) => response,
            None => return self.count_unread().await,
        };

        // The checkpoint moves before the new messages are written
        let checkpoint = query_value(&url, "until").unwrap_or(now);
        self.store_last_checked(checkpoint).await?;

        let unread = self.sync(response).await?;
        info!(
            "Messages sync finished in {}: {} unread",
            fmt_ms(started.elapsed()),
            unread
        );
        Ok(unread)
    }

    /// Feed URL for a sync whose previous checkpoint is `last_checked`.
    /// `None` when no platform is configured.
    pub fn generate_url(&self, last_checked: i64) -> Option<Url> {
        self.build_url(last_checked, now_millis())
    }

    fn build_url(&self, last_checked: i64, now: i64) -> Option<Url> {
        let platform = self
            .config
            .platform
            .as_deref()
            .filter(|p| !p.is_empty())?;

        let mut url = match Url::parse(&self.config.endpoint) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid messages endpoint {}: {}", self.config.endpoint, e);
                return None;
            }
        };

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("platform", platform);

            if let Some(channel) = self.config.channel.as_deref().filter(|c| !c.is_empty()) {
                let channel = if channel == "latest" { "stable" } else { channel };
                query.append_pair("channel", channel);
            }

            if last_checked != 0 {
                query.append_pair("since", &last_checked.to_string());
                query.append_pair("until", &now.to_string());
            }
        }

        Some(url)
    }

    /// Last successful sync checkpoint in epoch millis, `0` when never synced
    pub async fn last_checked(&self) -> Result<i64> {
        let value: Option<serde_json::Value> = self.store.get(META, UPDATE_TIME_KEY).await?;
        let checkpoint = match value {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        Ok(checkpoint.unwrap_or(0))
    }

    pub async fn store_last_checked(&self, time: i64) -> Result<()> {
        self.store.set(META, UPDATE_TIME_KEY, &time).await
    }

    /// Apply a feed response to the store and return the unread count.
    pub async fn sync(&self, response: MessagesResponse) -> Result<usize> {
        self.reconcile(response.items).await?;
        self.count_unread().await
    }

    /// Insert incoming messages not stored yet, all unread.
    /// Returns how many were inserted.
    async fn reconcile(&self, items: Vec<Message>) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let existing: HashSet<String> = self.store.list_keys(MESSAGES).await?.into_iter().collect();
        let received = items.len();

        let records: Vec<(String, StoredMessage)> = items
            .into_iter()
            .filter(|m| {
                if m.id.is_empty() {
                    warn!("Skipping message without id (time {})", m.time);
                    return false;
                }
                !existing.contains(&m.id)
            })
            .map(|m| (m.id.clone(), StoredMessage::unread(m)))
            .collect();

        if records.is_empty() {
            debug!("All {} received messages are already stored", received);
            return Ok(0);
        }

        self.store.bulk_set(MESSAGES, &records).await?;
        info!("Stored {} new of {} received messages", records.len(), received);
        Ok(records.len())
    }

    pub async fn count_unread(&self) -> Result<usize> {
        self.store.count(MESSAGES, Some(unread_query())).await
    }

    /// All stored messages, newest first
    pub async fn read_messages(&self) -> Result<Vec<StoredMessage>> {
        let mut messages: Vec<StoredMessage> = self.store.list_objects(MESSAGES, None).await?;
        messages.sort_by(|a, b| b.message.time.cmp(&a.message.time));
        Ok(messages)
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let mut message: StoredMessage = self
            .store
            .get(MESSAGES, id)
            .await?
            .ok_or_else(|| MessagingError::MessageNotFound(id.to_string()))?;

        message.read = ReadState::Read;
        self.store.set(MESSAGES, id, &message).await
    }

    /// Mark every unread message read. Returns how many changed.
    pub async fn mark_all_read(&self) -> Result<usize> {
        let unread: Vec<StoredMessage> = self.store.list_objects(MESSAGES, Some(unread_query())).await?;
        if unread.is_empty() {
            return Ok(0);
        }

        let records: Vec<(String, StoredMessage)> = unread
            .into_iter()
            .map(|mut m| {
                m.read = ReadState::Read;
                (m.message.id.clone(), m)
            })
            .collect();

        self.store.bulk_set(MESSAGES, &records).await?;
        info!("Marked {} messages read", records.len());
        Ok(records.len())
    }

    pub async fn close_db(&self) {
        self.store.close().await
    }

    fn refresh_interval_ms(&self) -> i64 {
        i64::try_from(self.config.refresh_interval().as_millis()).unwrap_or(i64::MAX)
    }
}

fn unread_query() -> IndexQuery {
    IndexQuery::new("read", u8::from(ReadState::Unread))
}

fn query_value(url: &Url, name: &str) -> Option<i64> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .and_then(|(_, value)| value.parse().ok())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
