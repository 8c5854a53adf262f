use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub verb: String,
    pub freeform_args: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Schedule,
    Speakers,
    Ticket,
    Countdown,
    Quiz,
    RandomTalk,
    Leaderboard,
    Help,
    Unknown { verb: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_command(payload: SlashCommandPayload) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != "/confetti" {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let text = payload.text.trim().to_owned();
    let mut parts = text.split_whitespace();
    let verb = parts.next().unwrap_or("help").to_ascii_lowercase();
    let freeform_args = parts.collect::<Vec<_>>().join(" ");

    Ok(CommandEnvelope {
        verb,
        freeform_args,
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_ts: payload.trigger_ts,
        request_id: payload.request_id,
    })
}

pub fn classify_command(verb: &str) -> BotCommand {
    match verb {
        "schedule" | "agenda" => BotCommand::Schedule,
        "speakers" => BotCommand::Speakers,
        "ticket" | "register" => BotCommand::Ticket,
        "countdown" => BotCommand::Countdown,
        "quiz" => BotCommand::Quiz,
        "talk" | "randomtalk" => BotCommand::RandomTalk,
        "leaderboard" | "top" => BotCommand::Leaderboard,
        "help" | "" => BotCommand::Help,
        other => BotCommand::Unknown { verb: other.to_owned() },
    }
}

/// Behavior behind each slash-command verb. The server wires the real
/// implementation (fetcher, catalog, tracker); the Noop keeps the dispatcher
/// constructible without one.
#[async_trait]
pub trait CommandService: Send + Sync {
    async fn schedule(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
    async fn speakers(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
    async fn ticket(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
    async fn countdown(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
    async fn quiz(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
    async fn random_talk(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
    async fn leaderboard(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        envelope: CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match classify_command(&envelope.verb) {
            BotCommand::Schedule => self.service.schedule(&envelope).await,
            BotCommand::Speakers => self.service.speakers(&envelope).await,
            BotCommand::Ticket => self.service.ticket(&envelope).await,
            BotCommand::Countdown => self.service.countdown(&envelope).await,
            BotCommand::Quiz => self.service.quiz(&envelope).await,
            BotCommand::RandomTalk => self.service.random_talk(&envelope).await,
            BotCommand::Leaderboard => self.service.leaderboard(&envelope).await,
            BotCommand::Help => Ok(blocks::help_message()),
            BotCommand::Unknown { verb } => Ok(blocks::error_message(&format!(
                "Unsupported command `/confetti {verb}`. Try `/confetti help`."
            ))),
        }
    }
}

/// Service that answers every verb with a static placeholder.
#[derive(Default)]
pub struct NoopCommandService;

#[async_trait]
impl CommandService for NoopCommandService {
    async fn schedule(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::error_message("Schedule data is not available in preview mode."))
    }

    async fn speakers(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::error_message("Speaker data is not available in preview mode."))
    }

    async fn ticket(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::ticket_message("soon", "https://example.invalid"))
    }

    async fn countdown(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::countdown_message(None, "soon", "https://example.invalid"))
    }

    async fn quiz(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::error_message("The quiz catalog is not loaded in preview mode."))
    }

    async fn random_talk(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::error_message("Talk data is not available in preview mode."))
    }

    async fn leaderboard(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::leaderboard_message(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify_command, normalize_command, BotCommand, CommandParseError, CommandRouter,
        NoopCommandService, SlashCommandPayload,
    };

    fn payload(command: &str, text: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            text: text.to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            trigger_ts: "1730000000.1000".to_owned(),
            request_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn normalize_rejects_foreign_commands() {
        let error = normalize_command(payload("/deploy", "prod")).expect_err("should reject");
        assert_eq!(error, CommandParseError::UnsupportedCommand("/deploy".to_owned()));
    }

    #[test]
    fn normalize_lowercases_the_verb_and_keeps_args() {
        let envelope =
            normalize_command(payload("/confetti", "  Leaderboard top ten ")).expect("normalize");
        assert_eq!(envelope.verb, "leaderboard");
        assert_eq!(envelope.freeform_args, "top ten");
    }

    #[test]
    fn empty_text_defaults_to_help() {
        let envelope = normalize_command(payload("/confetti", "")).expect("normalize");
        assert_eq!(classify_command(&envelope.verb), BotCommand::Help);
    }

    #[test]
    fn verbs_classify_with_aliases() {
        assert_eq!(classify_command("schedule"), BotCommand::Schedule);
        assert_eq!(classify_command("agenda"), BotCommand::Schedule);
        assert_eq!(classify_command("talk"), BotCommand::RandomTalk);
        assert_eq!(classify_command("randomtalk"), BotCommand::RandomTalk);
        assert_eq!(classify_command("top"), BotCommand::Leaderboard);
        assert_eq!(
            classify_command("dance"),
            BotCommand::Unknown { verb: "dance".to_owned() }
        );
    }

    #[tokio::test]
    async fn unknown_verb_routes_to_guidance_message() {
        let router = CommandRouter::new(NoopCommandService);
        let envelope = normalize_command(payload("/confetti", "dance")).expect("normalize");

        let message = router.route(envelope).await.expect("route");
        let rendered = serde_json::to_string(&message.blocks).expect("serialize");
        assert!(rendered.contains("Unsupported command"));
    }

    #[tokio::test]
    async fn help_routes_without_a_service_call() {
        let router = CommandRouter::new(NoopCommandService);
        let envelope = normalize_command(payload("/confetti", "help")).expect("normalize");

        let message = router.route(envelope).await.expect("route");
        assert_eq!(message.fallback_text, "Confetti commands");
    }
}
