//! View model of the "What's new" dialog
//!
//! Toolkit-agnostic: it holds the messages to show, formats them for
//! display and reports link activation on a channel. The host decides how
//! to draw entries and how to open external links.

use chrono::{TimeZone, Utc};
use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::StoredMessage;

pub const DIALOG_TITLE: &str = "What's new";
pub const EMPTY_TEXT: &str = "There are no messages available at the moment.";

/// Requests the host should handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationEvent {
    /// Open the URL outside the application
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogAction {
    pub url: String,
    pub label: String,
}

/// One message as displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogEntry {
    pub title: String,
    pub abstract_text: String,
    pub date: String,
    pub action: Option<DialogAction>,
}

pub struct MessagesDialog {
    messages: Vec<StoredMessage>,
    opened: bool,
    navigation_tx: Sender<NavigationEvent>,
}

impl MessagesDialog {
    pub fn new() -> (Self, Receiver<NavigationEvent>) {
        let (tx, rx) = flume::unbounded();
        let dialog = Self {
            messages: Vec::new(),
            opened: false,
            navigation_tx: tx,
        };
        (dialog, rx)
    }

    /// Replace the displayed messages. Order is kept as given.
    pub fn set_messages(&mut self, messages: Vec<StoredMessage>) {
        self.messages = messages;
    }

    pub fn open(&mut self) {
        self.opened = true;
    }

    pub fn close(&mut self) {
        self.opened = false;
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn entries(&self) -> Vec<DialogEntry> {
        self.messages.iter().map(entry).collect()
    }

    /// Plain-text rendering, empty while the dialog is closed
    pub fn render(&self) -> String {
        if !self.opened {
            return String::new();
        }

        let mut out = String::from(DIALOG_TITLE);
        out.push('\n');

        if self.messages.is_empty() {
            out.push('\n');
            out.push_str(EMPTY_TEXT);
            out.push('\n');
            return out;
        }

        for entry in self.entries() {
            out.push('\n');
            out.push_str(&entry.title);
            out.push('\n');
            if !entry.abstract_text.is_empty() {
                out.push_str(&entry.abstract_text);
                out.push('\n');
            }
            out.push_str(&entry.date);
            out.push('\n');
            if let Some(action) = entry.action {
                out.push_str(&format!("{}: {}\n", action.label, action.url));
            }
        }
        out
    }

    /// Ask the host to open the action link of the entry at `index`.
    /// Returns whether a navigation event was sent.
    pub fn open_action(&self, index: usize) -> bool {
        let Some((url, _)) = self.messages.get(index).and_then(|m| m.message.action()) else {
            return false;
        };

        debug!("Opening message link {}", url);
        self.navigation_tx
            .send(NavigationEvent::External(url.to_string()))
            .is_ok()
    }
}

fn entry(stored: &StoredMessage) -> DialogEntry {
    let message = &stored.message;
    DialogEntry {
        title: message.title.clone(),
        abstract_text: message.abstract_text.clone(),
        date: format_date(message.time),
        action: message.action().map(|(url, label)| DialogAction {
            url: url.to_string(),
            label: label.to_string(),
        }),
    }
}

/// e.g. "June 5, 2021, 3:04 PM" (UTC)
pub fn format_date(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%B %-d, %Y, %-I:%M %p").to_string(),
        None => String::new(),
    }
}
