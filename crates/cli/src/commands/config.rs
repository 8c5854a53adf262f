use confetti_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ConfigView {
    slack_app_token: String,
    slack_bot_token: String,
    daily_buzz_channel: String,
    keyword_channels: Vec<String>,
    timezone: String,
    quiz_reveal_delay_hours: u64,
    catalog_dir: String,
    store_path: String,
    conference_url: String,
    conference_date: String,
    health_check_port: u16,
    log_level: String,
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "(unset)".to_string()
    } else {
        let prefix: String = secret.chars().take(5).collect();
        format!("{prefix}…(redacted)")
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("configuration failed to load: {error}"),
    };

    let view = ConfigView {
        slack_app_token: redact(config.slack.app_token.expose_secret()),
        slack_bot_token: redact(config.slack.bot_token.expose_secret()),
        daily_buzz_channel: config.channels.daily_buzz.clone(),
        keyword_channels: config.channels.keyword_channels.clone(),
        timezone: config.schedule.timezone.clone(),
        quiz_reveal_delay_hours: config.schedule.quiz_reveal_delay_hours,
        catalog_dir: config.content.catalog_dir.display().to_string(),
        store_path: config.store.path.display().to_string(),
        conference_url: config.content.conference_url.clone(),
        conference_date: config.content.conference_date.clone(),
        health_check_port: config.server.health_check_port,
        log_level: config.logging.level.clone(),
    };

    serde_json::to_string_pretty(&view)
        .unwrap_or_else(|error| format!("config serialization failed: {error}"))
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redaction_keeps_only_the_token_prefix() {
        assert_eq!(redact("xoxb-123456789"), "xoxb-…(redacted)");
        assert_eq!(redact(""), "(unset)");
    }
}
