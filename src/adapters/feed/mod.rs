//! HTTP client for the remote "what's new" feed

use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::types::error::{MessagingError, Result};
use crate::types::MessagesResponse;

pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MessagingError::Network(format!("HTTP client error: {}", e)))?;

        Ok(Self { client })
    }

    /// GET the feed. A non-success status means "no new data" and yields
    /// `None`; a failed request or an unreadable body is an error.
    pub async fn get_messages(&self, url: &Url) -> Result<Option<MessagesResponse>> {
        debug!("Fetching messages from {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MessagingError::Network(format!("Messages request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Messages endpoint responded with {}", status);
            return Ok(None);
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| MessagingError::Parse(format!("Failed to parse messages response: {}", e)))?;

        debug!("Received {} messages", parsed.items.len());
        Ok(Some(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> FeedClient {
        FeedClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_success_parses_items() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/messages"))
            .and(query_param("platform", "chrome"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "a", "time": 1, "title": "First" },
                    { "id": "b", "time": 2, "title": "Second" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/v1/messages?platform=chrome", mock_server.uri())).unwrap();
        let response = client().get_messages(&url).await.unwrap().unwrap();

        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[1].title, "Second");
    }

    #[tokio::test]
    async fn test_server_error_is_no_data() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/v1/messages", mock_server.uri())).unwrap();
        let response = client().get_messages(&url).await.unwrap();

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/v1/messages", mock_server.uri())).unwrap();
        let result = client().get_messages(&url).await;

        assert!(matches!(result, Err(MessagingError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Grab a free port and release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{}/v1/messages", port)).unwrap();

        let result = client().get_messages(&url).await;

        assert!(matches!(result, Err(MessagingError::Network(_))));
    }
}
