//! Long-polling Bot API client.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use courier_core::{
    ChatId, Message, MessageId, OutgoingMessage, Sender, TransportError, TransportResult, Update,
    UpdateSource, User,
};

use crate::api::{ALLOWED_UPDATES, GetUpdates, RemoveReplyMarkup, decode_response, decode_updates};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Headroom on top of the long-poll timeout before a request is abandoned.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Connection settings of one bot.
#[derive(Clone)]
pub struct TelegramConfig {
    token: String,
    api_url: String,
    poll_timeout: Duration,
    limit: u32,
}

impl TelegramConfig {
    /// Creates settings for `token` against the public Bot API.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_timeout: Duration::from_secs(30),
            limit: 100,
        }
    }

    /// Sets the base URL, e.g. of a local Bot API server.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the server-side long-poll timeout.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the maximum batch size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url.trim_end_matches('/'), self.token)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .field("limit", &self.limit)
            .finish()
    }
}

/// A Bot API client for one bot.
///
/// Acts as both halves of the transport: [`UpdateSource`] through
/// `getUpdates` long polling, and [`Sender`] through `sendMessage` and
/// `editMessageReplyMarkup`. The polling offset lives in memory; each poll
/// acknowledges everything handed out by the previous one.
pub struct TelegramApi {
    client: Client,
    config: TelegramConfig,
    offset: AtomicI64,
}

impl TelegramApi {
    /// Creates a client.
    pub fn new(config: TelegramConfig) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.poll_timeout + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TransportError::request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            offset: AtomicI64::new(0),
        })
    }

    /// The offset the next poll will send; 0 before the first update.
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::SeqCst)
    }

    /// Calls `getMe`, e.g. to verify the token at startup.
    pub async fn get_me(&self) -> TransportResult<User> {
        self.call("getMe", &serde_json::Map::new()).await
    }

    /// Calls a Bot API method with a JSON body.
    pub async fn call<B, T>(&self, method: &str, body: &B) -> TransportResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        trace!(method, "Calling Bot API");
        let response = self
            .client
            .post(self.config.method_url(method))
            .json(body)
            .send()
            .await
            // The URL embeds the token.
            .map_err(|e| TransportError::request(e.without_url().to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::request(e.without_url().to_string()))?;
        decode_response(&bytes)
    }
}

#[async_trait]
impl UpdateSource for TelegramApi {
    async fn next_updates(&self) -> TransportResult<Vec<Update>> {
        let offset = self.offset();
        let request = GetUpdates {
            offset: (offset > 0).then_some(offset),
            limit: self.config.limit,
            timeout: self.config.poll_timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };

        let raw: Vec<Value> = self.call("getUpdates", &request).await?;
        let batch = decode_updates(raw)?;
        if let Some(next) = batch.next_offset {
            self.offset.fetch_max(next, Ordering::SeqCst);
            debug!(offset = next, count = batch.updates.len(), "Polled updates");
        }
        Ok(batch.updates)
    }
}

#[async_trait]
impl Sender for TelegramApi {
    async fn send(&self, message: &OutgoingMessage) -> TransportResult<Message> {
        self.call("sendMessage", message).await
    }

    async fn strip_keyboard(&self, chat_id: ChatId, message_id: MessageId) -> TransportResult<()> {
        // Answers with the edited message, or `true` for inline messages.
        let _: Value = self
            .call("editMessageReplyMarkup", &RemoveReplyMarkup { chat_id, message_id })
            .await?;
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApi")
            .field("config", &self.config)
            .field("offset", &self.offset())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let config = TelegramConfig::new("123:abc").api_url("http://localhost:8081/");
        assert_eq!(config.method_url("getMe"), "http://localhost:8081/bot123:abc/getMe");
    }

    #[test]
    fn test_debug_hides_token() {
        let api = TelegramApi::new(TelegramConfig::new("123:secret")).unwrap();
        assert!(!format!("{api:?}").contains("secret"));
        assert_eq!(api.offset(), 0);
    }
}
