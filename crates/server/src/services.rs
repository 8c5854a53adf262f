use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use confetti_core::catalog::{Bucket, Catalog};
use confetti_core::config::ContentConfig;
use confetti_engine::fetcher::ConferenceFetcher;
use confetti_engine::tracker::EngagementTracker;
use confetti_slack::api::{ChatApi, PostMessageRequest};
use confetti_slack::blocks::{self, LeaderboardRow, MessageTemplate, ScheduleView};
use confetti_slack::commands::{CommandEnvelope, CommandRouteError, CommandService};
use confetti_slack::events::{EngagementService, EventHandlerError};
use confetti_store::Store;
use rand::seq::SliceRandom;
use tracing::warn;

/// How many recent channel messages the on-demand quiz reveal scans to find
/// the quiz post it should thread under.
const QUIZ_HISTORY_LOOKBACK: u32 = 10;

pub(crate) fn date_label(config: &ContentConfig) -> String {
    DateTime::parse_from_rfc3339(&config.conference_date)
        .map(|date| date.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| config.conference_date.clone())
}

/// Slash-command behavior backed by the real catalog, fetcher, and tracker.
pub struct BotCommandService {
    pub catalog: Arc<Catalog>,
    pub tracker: EngagementTracker,
    pub fetcher: Arc<ConferenceFetcher>,
    pub api: Arc<dyn ChatApi>,
    pub content: ContentConfig,
    pub quiz_reveal_delay: Duration,
}

#[async_trait]
impl CommandService for BotCommandService {
    async fn schedule(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let talks = match self.fetcher.talks().await {
            Ok(talks) => talks,
            Err(error) => {
                warn!(error = %error, "schedule command could not fetch agenda");
                return Ok(blocks::error_message(&format!(
                    "Failed to fetch the schedule. Check <{}|the conference site> for the latest.",
                    self.content.conference_url
                )));
            }
        };

        let mut halls: Vec<String> = Vec::new();
        for talk in &talks {
            if !talk.hall.is_empty() && !halls.contains(&talk.hall) {
                halls.push(talk.hall.clone());
            }
        }

        Ok(blocks::schedule_message(&ScheduleView {
            date_label: date_label(&self.content),
            venue: self.content.conference_venue.clone(),
            doors_open: self.content.doors_open.clone(),
            url: self.content.conference_url.clone(),
            halls,
            talks,
        }))
    }

    async fn speakers(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match self.fetcher.speakers().await {
            Ok(speakers) => {
                let rows: Vec<_> =
                    speakers.into_iter().map(|speaker| speaker.into_row()).collect();
                Ok(blocks::speakers_message(&rows, &self.content.conference_url))
            }
            Err(error) => {
                warn!(error = %error, "speakers command could not fetch the lineup");
                Ok(blocks::error_message(&format!(
                    "Failed to fetch speakers. Check <{}|the conference site> for the latest.",
                    self.content.conference_url
                )))
            }
        }
    }

    async fn ticket(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::ticket_message(&date_label(&self.content), &self.content.conference_url))
    }

    async fn countdown(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let remaining = DateTime::parse_from_rfc3339(&self.content.conference_date)
            .ok()
            .map(|date| date.with_timezone(&Utc) - Utc::now())
            .filter(|delta| *delta > Duration::zero())
            .map(|delta| {
                (delta.num_days(), delta.num_hours() % 24, delta.num_minutes() % 60)
            });

        Ok(blocks::countdown_message(
            remaining,
            &date_label(&self.content),
            &self.content.conference_url,
        ))
    }

    async fn quiz(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let items = self.catalog.items(Bucket::Quiz);
        let item = {
            let mut rng = rand::thread_rng();
            items.choose(&mut rng)
        };
        let Some(item) = item else {
            return Ok(blocks::error_message("No quiz questions are loaded."));
        };
        let Some(quiz) = item.quiz() else {
            return Ok(blocks::error_message("No quiz questions are loaded."));
        };

        // The reveal threads under the quiz message once the delay elapses.
        // The command response is posted after this returns, so the message
        // timestamp is not known yet; at fire time recent history is scanned
        // for the quiz question instead. On-demand reveals are best-effort
        // and do not survive a restart, unlike the scheduled quiz path.
        spawn_on_demand_reveal(
            self.api.clone(),
            envelope.channel_id.clone(),
            quiz.clone(),
            self.quiz_reveal_delay,
        );

        Ok(blocks::quiz_message(quiz))
    }

    async fn random_talk(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match self.fetcher.random_talk().await {
            Ok(Some(talk)) => {
                Ok(blocks::random_talk_message(&talk, &self.content.conference_url))
            }
            Ok(None) => Ok(blocks::error_message("No talks available yet. Check back soon!")),
            Err(error) => {
                warn!(error = %error, "random talk command could not fetch agenda");
                Ok(blocks::error_message("Couldn't fetch the schedule. Try again in a bit!"))
            }
        }
    }

    async fn leaderboard(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let standings = self.tracker.leaderboard(10).await;
        let rows: Vec<LeaderboardRow> = standings
            .into_iter()
            .map(|standing| LeaderboardRow {
                user_id: standing.user_id,
                score: standing.score,
                badges: standing.entry.badges,
            })
            .collect();
        Ok(blocks::leaderboard_message(&rows))
    }
}

fn spawn_on_demand_reveal(
    api: Arc<dyn ChatApi>,
    channel_id: String,
    quiz: confetti_core::catalog::QuizContent,
    delay: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay.to_std().unwrap_or_default()).await;

        let history = match api.read_history(&channel_id, QUIZ_HISTORY_LOOKBACK).await {
            Ok(history) => history,
            Err(error) => {
                warn!(error = %error, "on-demand quiz reveal could not read history");
                return;
            }
        };

        let Some(quiz_message) = history
            .iter()
            .find(|message| message.bot_id.is_some() && message.text.contains(&quiz.question))
        else {
            warn!(channel_id = %channel_id, "on-demand quiz message not found in history; reveal dropped");
            return;
        };

        let message = blocks::quiz_reveal_message(&quiz);
        let request = PostMessageRequest {
            channel: channel_id.clone(),
            text: message.fallback_text.clone(),
            blocks: Some(message.blocks),
            thread_ts: Some(quiz_message.ts.clone()),
        };
        if let Err(error) = api.post_message(request).await {
            warn!(error = %error, "on-demand quiz reveal failed");
        }
    });
}

/// Engagement wiring: channel messages and reactions feed the tracker, and
/// letter-emoji reactions on a posted quiz count as quiz answers.
#[derive(Clone)]
pub struct BotEngagementService {
    pub tracker: EngagementTracker,
    pub store: Store,
    pub catalog: Arc<Catalog>,
}

/// Map an answer reaction to an option index: `a`..`d` block letters or
/// regional-indicator letters.
fn quiz_option_index(reaction: &str) -> Option<usize> {
    match reaction.trim().trim_matches(':').to_ascii_lowercase().as_str() {
        "a" | "regional_indicator_a" => Some(0),
        "b" | "regional_indicator_b" => Some(1),
        "c" | "regional_indicator_c" => Some(2),
        "d" | "regional_indicator_d" => Some(3),
        _ => None,
    }
}

fn option_letter(index: usize) -> String {
    char::from_u32('A' as u32 + index as u32).map(String::from).unwrap_or_else(|| index.to_string())
}

#[async_trait]
impl EngagementService for BotEngagementService {
    async fn record_message(&self, user_id: &str) -> Result<(), EventHandlerError> {
        self.tracker
            .track_message(user_id)
            .await
            .map_err(|error| EventHandlerError::Engagement(error.to_string()))?;
        Ok(())
    }

    async fn record_reaction(
        &self,
        user_id: &str,
        reaction: &str,
        item_ts: Option<&str>,
    ) -> Result<(), EventHandlerError> {
        // A letter reaction on a posted quiz is an answer, not generic
        // engagement.
        if let (Some(option_index), Some(item_ts)) = (quiz_option_index(reaction), item_ts) {
            if let Some((content_id, record)) = self.store.find_posted_by_ts(item_ts).await {
                if record.content_type == Bucket::Quiz {
                    if let Some(quiz) =
                        self.catalog.find(Bucket::Quiz, &content_id).and_then(|item| item.quiz())
                    {
                        self.tracker
                            .track_quiz_answer(
                                user_id,
                                &content_id,
                                &option_letter(option_index),
                                &option_letter(quiz.answer),
                            )
                            .await
                            .map_err(|error| {
                                EventHandlerError::Engagement(error.to_string())
                            })?;
                        return Ok(());
                    }
                }
            }
        }

        self.tracker
            .track_reaction(user_id, item_ts)
            .await
            .map_err(|error| EventHandlerError::Engagement(error.to_string()))?;
        Ok(())
    }
}
