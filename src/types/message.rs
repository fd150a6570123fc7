use serde::{Deserialize, Serialize};

/// Release channel a message targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Beta,
    Alpha,
    /// Any channel this build does not know about
    #[serde(other)]
    Unknown,
}

/// A "what's new" message as issued by the remote feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Creation time in epoch millis. Unique per stored message.
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Platforms this message applies to
    #[serde(default)]
    pub target: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actionurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Message {
    /// The call to action as `(url, label)`, only when both are set.
    pub fn action(&self) -> Option<(&str, &str)> {
        match (self.actionurl.as_deref(), self.cta.as_deref()) {
            (Some(url), Some(label)) if !url.is_empty() && !label.is_empty() => Some((url, label)),
            _ => None,
        }
    }
}

/// Read flag of a stored message, persisted as `0` (unread) or `1` (read)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ReadState {
    #[default]
    Unread,
    Read,
}

impl From<ReadState> for u8 {
    fn from(state: ReadState) -> Self {
        match state {
            ReadState::Unread => 0,
            ReadState::Read => 1,
        }
    }
}

impl TryFrom<u8> for ReadState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReadState::Unread),
            1 => Ok(ReadState::Read),
            other => Err(format!("invalid read flag: {}", other)),
        }
    }
}

/// A message held in the local store, with its read flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default)]
    pub read: ReadState,
}

impl StoredMessage {
    pub fn unread(message: Message) -> Self {
        Self {
            message,
            read: ReadState::Unread,
        }
    }

    pub fn is_read(&self) -> bool {
        self.read == ReadState::Read
    }
}

/// Body of a successful feed response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub items: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_parses_wire_format() {
        let json = r#"{
            "id": "m-1",
            "kind": "ArcInfo#Message",
            "channel": "beta",
            "title": "New release",
            "abstract": "Lots of fixes",
            "target": ["electron", "chrome"],
            "time": 1600000000000,
            "actionurl": "https://example.com/notes",
            "cta": "Read more"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.channel, Some(Channel::Beta));
        assert_eq!(message.abstract_text, "Lots of fixes");
        assert_eq!(message.target, vec!["electron", "chrome"]);
        assert_eq!(message.action(), Some(("https://example.com/notes", "Read more")));
    }

    #[test]
    fn test_message_tolerates_sparse_items() {
        // The feed is allowed to omit everything but identity and time
        let message: Message =
            serde_json::from_str(r#"{"id": "x", "time": 5, "message": "test"}"#).unwrap();
        assert_eq!(message.title, "");
        assert!(message.channel.is_none());
        assert!(message.action().is_none());
    }

    #[test]
    fn test_action_requires_url_and_label() {
        let mut message: Message = serde_json::from_str(r#"{"id": "x", "time": 5}"#).unwrap();
        message.actionurl = Some("https://example.com".to_string());
        assert!(message.action().is_none());

        message.cta = Some(String::new());
        assert!(message.action().is_none());
    }

    #[test]
    fn test_stored_message_flattens_read_flag() {
        let message: Message = serde_json::from_str(r#"{"id": "x", "time": 5}"#).unwrap();
        let stored = StoredMessage::unread(message);

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], "x");
        assert_eq!(json["read"], 0);
    }

    #[test]
    fn test_read_flag_rejects_other_values() {
        let result: Result<StoredMessage, _> =
            serde_json::from_str(r#"{"id": "x", "time": 5, "read": 2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_channel_is_tolerated() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"items": [
                {"id": "a", "time": 1, "channel": "stable"},
                {"id": "b", "time": 2, "channel": "dev"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(response.items[0].channel, Some(Channel::Stable));
        assert_eq!(response.items[1].channel, Some(Channel::Unknown));
    }

    #[test]
    fn test_response_without_items() {
        let response: MessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(response.items.is_empty());
    }
}
