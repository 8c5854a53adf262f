use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::Block;

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("chat platform transport failed during `{method}`: {source}")]
    Transport { method: &'static str, source: reqwest::Error },
    #[error("chat platform rejected `{method}`: {error}")]
    Api { method: &'static str, error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostMessageRequest {
    pub channel: String,
    pub text: String,
    pub blocks: Option<Vec<Block>>,
    pub thread_ts: Option<String>,
}

impl PostMessageRequest {
    pub fn text_only(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self { channel: channel.into(), text: text.into(), blocks: None, thread_ts: None }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HistoryMessage {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// The minimal chat-platform surface the bot consumes. Everything else the
/// platform offers is out of scope; keeping the trait narrow keeps every
/// engine path drivable by an in-memory fake.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_channels(
        &self,
        types: &str,
        page_limit: u32,
    ) -> Result<Vec<ChannelInfo>, ChatApiError>;

    async fn post_message(&self, request: PostMessageRequest)
        -> Result<PostedMessage, ChatApiError>;

    async fn read_history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, ChatApiError>;
}

/// Slack Web API client over HTTPS.
pub struct HttpChatApi {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl HttpChatApi {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, "https://slack.com/api")
    }

    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), bot_token, base_url: base_url.into() }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<&'a [Block]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    payload: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ListChannelsPayload {
    channels: Vec<ChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct PostMessagePayload {
    channel: String,
    ts: String,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    messages: Vec<HistoryMessage>,
}

fn unwrap_envelope<T>(
    method: &'static str,
    envelope: SlackEnvelope<T>,
) -> Result<T, ChatApiError> {
    if !envelope.ok {
        return Err(ChatApiError::Api {
            method,
            error: envelope.error.unwrap_or_else(|| "unknown error".to_owned()),
        });
    }
    envelope.payload.ok_or(ChatApiError::Api { method, error: "missing payload".to_owned() })
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_channels(
        &self,
        types: &str,
        page_limit: u32,
    ) -> Result<Vec<ChannelInfo>, ChatApiError> {
        const METHOD: &str = "conversations.list";
        let limit = page_limit.to_string();
        let envelope: SlackEnvelope<ListChannelsPayload> = self
            .http
            .get(self.endpoint(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("types", types), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|source| ChatApiError::Transport { method: METHOD, source })?
            .json()
            .await
            .map_err(|source| ChatApiError::Transport { method: METHOD, source })?;

        Ok(unwrap_envelope(METHOD, envelope)?.channels)
    }

    async fn post_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<PostedMessage, ChatApiError> {
        const METHOD: &str = "chat.postMessage";
        let body = PostMessageBody {
            channel: &request.channel,
            text: &request.text,
            blocks: request.blocks.as_deref(),
            thread_ts: request.thread_ts.as_deref(),
        };

        let envelope: SlackEnvelope<PostMessagePayload> = self
            .http
            .post(self.endpoint(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|source| ChatApiError::Transport { method: METHOD, source })?
            .json()
            .await
            .map_err(|source| ChatApiError::Transport { method: METHOD, source })?;

        let payload = unwrap_envelope(METHOD, envelope)?;
        Ok(PostedMessage { channel: payload.channel, ts: payload.ts })
    }

    async fn read_history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, ChatApiError> {
        const METHOD: &str = "conversations.history";
        let limit = limit.to_string();
        let envelope: SlackEnvelope<HistoryPayload> = self
            .http
            .get(self.endpoint(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("channel", channel), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|source| ChatApiError::Transport { method: METHOD, source })?
            .json()
            .await
            .map_err(|source| ChatApiError::Transport { method: METHOD, source })?;

        Ok(unwrap_envelope(METHOD, envelope)?.messages)
    }
}

/// Chat API that accepts everything and reaches nothing; used when the bot
/// runs without credentials and as the default for offline tooling.
#[derive(Default)]
pub struct NoopChatApi;

#[async_trait]
impl ChatApi for NoopChatApi {
    async fn list_channels(
        &self,
        _types: &str,
        _page_limit: u32,
    ) -> Result<Vec<ChannelInfo>, ChatApiError> {
        Ok(Vec::new())
    }

    async fn post_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<PostedMessage, ChatApiError> {
        Ok(PostedMessage { channel: request.channel, ts: "0.000000".to_owned() })
    }

    async fn read_history(
        &self,
        _channel: &str,
        _limit: u32,
    ) -> Result<Vec<HistoryMessage>, ChatApiError> {
        Ok(Vec::new())
    }
}
