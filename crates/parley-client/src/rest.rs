//! HTTP implementation of [`ChatApi`].
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET  chat/rooms` -> [`RoomList`]
//! - `GET  chat/rooms/{room}/messages?limit=N` -> [`HistoryPage`]
//! - `PUT  chat/rooms/{room}/unread` with [`UnreadUpdate`]

use async_trait::async_trait;
use parley_core::{Message, RoomId, RoomSummary};
use parley_proto::rest::{HistoryPage, RoomList, UnreadUpdate};
use url::Url;

use crate::{
    ApiError, ChatApi,
    transport::{TransportConfig, TransportError},
};

/// [`ChatApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    http: reqwest::Client,
    base: Url,
}

impl HttpChatApi {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, config: &TransportConfig) -> Result<Self, TransportError> {
        let base = Url::parse(base_url)
            .map_err(|e| TransportError::Connection(format!("invalid api url: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Connection(format!("http client: {e}")))?;

        Ok(Self { http, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Request(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn non-success responses into [`ApiError::Status`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let reason = response.text().await.unwrap_or_else(|_| status.to_string());
    Err(ApiError::Status { status: status.as_u16(), reason })
}

fn request_error(e: &reqwest::Error) -> ApiError {
    ApiError::Request(e.to_string())
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_history(&self, room_id: &RoomId, limit: u32) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["chat", "rooms", room_id.as_str(), "messages"])?;
        let response = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        let page: HistoryPage =
            check(response).await?.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(page.messages)
    }

    async fn update_unread(&self, room_id: &RoomId, unread_count: u32) -> Result<(), ApiError> {
        let url = self.endpoint(&["chat", "rooms", room_id.as_str(), "unread"])?;
        let body = UnreadUpdate { room_id: room_id.clone(), unread_count };
        let response =
            self.http.put(url).json(&body).send().await.map_err(|e| request_error(&e))?;

        check(response).await?;
        Ok(())
    }

    async fn fetch_summaries(&self) -> Result<Vec<RoomSummary>, ApiError> {
        let url = self.endpoint(&["chat", "rooms"])?;
        let response = self.http.get(url).send().await.map_err(|e| request_error(&e))?;

        let list: RoomList =
            check(response).await?.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(list.rooms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_room_ids() {
        let api = HttpChatApi::new("https://api.example.com/v1/", &TransportConfig::default());
        let url = api.ok().and_then(|a| a.endpoint(&["chat", "rooms", "a/b", "unread"]).ok());
        assert_eq!(
            url.map(|u| u.to_string()).as_deref(),
            Some("https://api.example.com/v1/chat/rooms/a%2Fb/unread")
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let api = HttpChatApi::new("mailto:ops@example.com", &TransportConfig::default());
        let result = api.ok().map(|a| a.endpoint(&["chat"]));
        assert!(matches!(result, Some(Err(ApiError::Request(_)))));
    }
}
