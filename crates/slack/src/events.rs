use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::{
    api::{ChatApi, PostMessageRequest},
    blocks::{self, MessageTemplate},
    commands::{
        normalize_command, CommandParseError, CommandRouteError, CommandRouter, CommandService,
        NoopCommandService, SlashCommandPayload,
    },
    resolver::ChannelResolver,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    ChannelMessage(ChannelMessageEvent),
    ReactionAdded(ReactionAddedEvent),
    TeamJoin(TeamJoinEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::ChannelMessage(_) => SlackEventType::ChannelMessage,
            Self::ReactionAdded(_) => SlackEventType::ReactionAdded,
            Self::TeamJoin(_) => SlackEventType::TeamJoin,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    ChannelMessage,
    ReactionAdded,
    TeamJoin,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMessageEvent {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionAddedEvent {
    pub channel_id: String,
    pub user_id: String,
    pub reaction: String,
    /// Timestamp of the message that was reacted to, when the platform
    /// includes it.
    pub item_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamJoinEvent {
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// Where a handler's response message should be posted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseTarget {
    pub channel_id: String,
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded { target: ResponseTarget, message: MessageTemplate },
    Processed,
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("engagement tracking failed: {0}")]
    Engagement(String),
    #[error("welcome delivery failed: {0}")]
    Welcome(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with no-op services; every event is accepted, nothing reaches
/// a platform or a store.
pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopCommandService));
    dispatcher.register(ReactionAddedHandler::new(NoopEngagementService));
    dispatcher
}

/// Sink for observed user activity. The server wires the engagement tracker
/// behind this; handlers stay free of store details.
#[async_trait]
pub trait EngagementService: Send + Sync {
    async fn record_message(&self, user_id: &str) -> Result<(), EventHandlerError>;
    async fn record_reaction(
        &self,
        user_id: &str,
        reaction: &str,
        item_ts: Option<&str>,
    ) -> Result<(), EventHandlerError>;
}

#[derive(Default)]
pub struct NoopEngagementService;

#[async_trait]
impl EngagementService for NoopEngagementService {
    async fn record_message(&self, _user_id: &str) -> Result<(), EventHandlerError> {
        Ok(())
    }

    async fn record_reaction(
        &self,
        _user_id: &str,
        _reaction: &str,
        _item_ts: Option<&str>,
    ) -> Result<(), EventHandlerError> {
        Ok(())
    }
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let channel_id = payload.channel_id.clone();
        let normalized = normalize_command(payload.clone())?;
        let message = self.router.route(normalized).await?;
        Ok(HandlerResult::Responded {
            target: ResponseTarget { channel_id, thread_ts: None },
            message,
        })
    }
}

/// Keyword auto-responses: fixed phrase tables answering common questions
/// with a thread reply. Only the first matching rule fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeywordTopic {
    Ticket,
    Schedule,
    WhenWhere,
}

const KEYWORD_RULES: &[(KeywordTopic, &[&str])] = &[
    (KeywordTopic::Ticket, &["ticket", "register", "registration", "sign up", "signup"]),
    (KeywordTopic::Schedule, &["schedule", "agenda", "timetable", "sessions"]),
    (KeywordTopic::WhenWhere, &["when is the conference", "where is the conference"]),
];

#[derive(Clone, Debug)]
pub struct KeywordResponder {
    conference_url: String,
    conference_date_label: String,
}

impl KeywordResponder {
    pub fn new(conference_url: impl Into<String>, conference_date_label: impl Into<String>) -> Self {
        Self {
            conference_url: conference_url.into(),
            conference_date_label: conference_date_label.into(),
        }
    }

    pub fn response_for(&self, text: &str) -> Option<String> {
        let normalized = normalize_words(text);
        let topic = KEYWORD_RULES.iter().find_map(|(topic, phrases)| {
            phrases.iter().any(|phrase| contains_phrase(&normalized, phrase)).then_some(*topic)
        })?;

        Some(match topic {
            KeywordTopic::Ticket => format!(
                "🎟️ Grab your ticket here: <{}|register> — Early bird might still be open!",
                self.conference_url
            ),
            KeywordTopic::Schedule => format!(
                "📋 Check the full schedule and sessions at <{}|the conference site>",
                self.conference_url
            ),
            KeywordTopic::WhenWhere => {
                format!("📅 {} — see <{}|the conference site> for venue details ☁️",
                    self.conference_date_label, self.conference_url)
            }
        })
    }
}

fn normalize_words(text: &str) -> String {
    let mut words = Vec::new();
    for raw in text.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(|ch| ch.is_alphanumeric() || *ch == '-')
            .collect::<String>()
            .to_lowercase();
        if !word.is_empty() {
            words.push(word);
        }
    }
    words.join(" ")
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    normalized
        .split(' ')
        .collect::<Vec<_>>()
        .windows(phrase.split(' ').count())
        .any(|window| window.join(" ") == phrase)
}

pub struct ChannelMessageHandler<S> {
    engagement: S,
    responder: KeywordResponder,
    api: Arc<dyn ChatApi>,
    resolver: Arc<ChannelResolver>,
    keyword_channels: Vec<String>,
}

impl<S> ChannelMessageHandler<S>
where
    S: EngagementService,
{
    pub fn new(
        engagement: S,
        responder: KeywordResponder,
        api: Arc<dyn ChatApi>,
        resolver: Arc<ChannelResolver>,
        keyword_channels: Vec<String>,
    ) -> Self {
        Self { engagement, responder, api, resolver, keyword_channels }
    }

    async fn keyword_channel_allows(&self, channel_id: &str) -> bool {
        for name in &self.keyword_channels {
            match self.resolver.resolve(name).await {
                Ok(resolved) if resolved == channel_id => return true,
                Ok(_) => {}
                Err(error) => {
                    warn!(channel_name = %name, error = %error, "keyword channel lookup failed");
                }
            }
        }
        false
    }
}

#[async_trait]
impl<S> EventHandler for ChannelMessageHandler<S>
where
    S: EngagementService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ChannelMessage
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ChannelMessage(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        // Bot echoes, edits, and thread replies never trigger responses or
        // engagement.
        if event.bot_id.is_some() || event.subtype.is_some() || event.thread_ts.is_some() {
            return Ok(HandlerResult::Ignored);
        }

        if let Some(response) = self.responder.response_for(&event.text) {
            if self.keyword_channel_allows(&event.channel_id).await {
                let request = PostMessageRequest::text_only(&event.channel_id, response)
                    .in_thread(&event.ts);
                if let Err(error) = self.api.post_message(request).await {
                    warn!(
                        channel_id = %event.channel_id,
                        error = %error,
                        "keyword auto-response failed"
                    );
                }
            }
        }

        if let Some(user_id) = &event.user_id {
            self.engagement.record_message(user_id).await?;
        }

        Ok(HandlerResult::Processed)
    }
}

pub struct ReactionAddedHandler<S> {
    engagement: S,
}

impl<S> ReactionAddedHandler<S>
where
    S: EngagementService,
{
    pub fn new(engagement: S) -> Self {
        Self { engagement }
    }
}

#[async_trait]
impl<S> EventHandler for ReactionAddedHandler<S>
where
    S: EngagementService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ReactionAdded
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ReactionAdded(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.engagement
            .record_reaction(&event.user_id, &event.reaction, event.item_ts.as_deref())
            .await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct TeamJoinHandler {
    api: Arc<dyn ChatApi>,
    conference_url: String,
}

impl TeamJoinHandler {
    pub fn new(api: Arc<dyn ChatApi>, conference_url: impl Into<String>) -> Self {
        Self { api, conference_url: conference_url.into() }
    }
}

#[async_trait]
impl EventHandler for TeamJoinHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::TeamJoin
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::TeamJoin(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        // A DM is addressed by the user id; the platform opens the
        // conversation on demand.
        let message = blocks::welcome_message(&self.conference_url);
        let request = PostMessageRequest {
            channel: event.user_id.clone(),
            text: message.fallback_text.clone(),
            blocks: Some(message.blocks.clone()),
            thread_ts: None,
        };
        self.api
            .post_message(request)
            .await
            .map_err(|error| EventHandlerError::Welcome(error.to_string()))?;

        Ok(HandlerResult::Processed)
    }
}
