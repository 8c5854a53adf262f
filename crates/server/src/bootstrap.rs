use std::sync::Arc;

use chrono::Duration;
use confetti_core::catalog::{Catalog, CatalogError};
use confetti_core::config::{AppConfig, ConfigError, LoadOptions};
use confetti_engine::actions::{default_entries, ActionDeps};
use confetti_engine::dispatcher::Dispatcher;
use confetti_engine::fetcher::ConferenceFetcher;
use confetti_engine::reveal::RevealScheduler;
use confetti_engine::tracker::EngagementTracker;
use confetti_slack::api::{ChatApi, HttpChatApi};
use confetti_slack::events::{
    ChannelMessageHandler, EventDispatcher, KeywordResponder, ReactionAddedHandler,
    SlashCommandHandler, TeamJoinHandler,
};
use confetti_slack::resolver::ChannelResolver;
use confetti_slack::socket::SocketModeRunner;
use confetti_store::Store;
use thiserror::Error;
use tracing::info;

use crate::services::{BotCommandService, BotEngagementService};

pub struct Application {
    pub config: AppConfig,
    pub store: Store,
    pub catalog: Arc<Catalog>,
    pub api: Arc<dyn ChatApi>,
    pub reveals: RevealScheduler,
    pub dispatcher: Dispatcher,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog load failed: {0}")]
    Catalog(#[from] CatalogError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!("starting application bootstrap");

    let catalog = Arc::new(Catalog::load_dir(&config.content.catalog_dir)?);
    for (bucket, size) in catalog.bucket_sizes() {
        info!(bucket = %bucket, items = size, "catalog bucket loaded");
    }

    let store = Store::open(&config.store.path).await;
    let summary = store.summary().await;
    info!(
        posted_content = summary.posted_content,
        engagement_events = summary.engagement_events,
        leaderboard_users = summary.leaderboard_users,
        pending_reveals = summary.pending_reveals,
        "state store opened"
    );

    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new(config.slack.bot_token.clone()));
    let resolver = Arc::new(ChannelResolver::new(api.clone()));
    let tracker = EngagementTracker::new(store.clone());
    let reveals = RevealScheduler::new(api.clone(), store.clone(), catalog.clone());
    let fetcher = Arc::new(ConferenceFetcher::new(
        config.content.agenda_url.clone(),
        config.content.speakers_url.clone(),
        config.content.cache_dir.clone(),
        std::time::Duration::from_secs(config.content.cache_ttl_minutes * 60),
    ));

    let quiz_reveal_delay = Duration::hours(config.schedule.quiz_reveal_delay_hours as i64);
    let deps = Arc::new(ActionDeps {
        catalog: catalog.clone(),
        store: store.clone(),
        api: api.clone(),
        resolver: resolver.clone(),
        tracker: tracker.clone(),
        reveals: reveals.clone(),
        fetcher: fetcher.clone(),
        channel: config.channels.daily_buzz.clone(),
        conference_url: config.content.conference_url.clone(),
        quiz_reveal_delay,
    });
    let dispatcher = Dispatcher::new(default_entries(deps, config.timezone()));

    let slack_runner = build_slack_runner(
        &config,
        catalog.clone(),
        store.clone(),
        tracker,
        fetcher,
        api.clone(),
        resolver,
        quiz_reveal_delay,
    );

    Ok(Application { config, store, catalog, api, reveals, dispatcher, slack_runner })
}

#[allow(clippy::too_many_arguments)]
fn build_slack_runner(
    config: &AppConfig,
    catalog: Arc<Catalog>,
    store: Store,
    tracker: EngagementTracker,
    fetcher: Arc<ConferenceFetcher>,
    api: Arc<dyn ChatApi>,
    resolver: Arc<ChannelResolver>,
    quiz_reveal_delay: Duration,
) -> SocketModeRunner {
    let engagement =
        BotEngagementService { tracker: tracker.clone(), store, catalog: catalog.clone() };
    let responder = KeywordResponder::new(
        config.content.conference_url.clone(),
        crate::services::date_label(&config.content),
    );

    let mut events = EventDispatcher::new();
    events.register(SlashCommandHandler::new(BotCommandService {
        catalog,
        tracker,
        fetcher,
        api: api.clone(),
        content: config.content.clone(),
        quiz_reveal_delay,
    }));
    events.register(ChannelMessageHandler::new(
        engagement.clone(),
        responder,
        api.clone(),
        resolver,
        config.channels.keyword_channels.clone(),
    ));
    events.register(ReactionAddedHandler::new(engagement));
    events.register(TeamJoinHandler::new(api.clone(), config.content.conference_url.clone()));

    // The transport stays a no-op until a WebSocket transport is wired in;
    // scheduled posting works either way, and responses still flow through
    // the chat API.
    SocketModeRunner::with_noop_transport(events).with_responder(api)
}

#[cfg(test)]
mod tests {
    use confetti_core::config::{ConfigOverrides, LoadOptions};
    use tempfile::TempDir;

    use super::bootstrap;

    fn overrides(dir: &TempDir, app_token: &str, bot_token: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some(app_token.to_owned()),
                slack_bot_token: Some(bot_token.to_owned()),
                store_path: Some(
                    dir.path().join("state.json").to_string_lossy().into_owned(),
                ),
                catalog_dir: Some(dir.path().join("content").to_string_lossy().into_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_valid_slack_tokens() {
        let dir = TempDir::new().expect("tempdir");
        let result = bootstrap(overrides(&dir, "invalid-token", "xoxb-valid")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_builds_the_full_weekly_schedule() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("content")).expect("content dir");

        let app = bootstrap(overrides(&dir, "xapp-test", "xoxb-test"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.dispatcher.entry_count(), 7);
        assert_eq!(app.store.summary().await.posted_content, 0);
        assert!(app.catalog.is_empty(), "empty content dir loads as an empty catalog");
    }
}
