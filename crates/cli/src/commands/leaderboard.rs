use confetti_core::config::{AppConfig, LoadOptions};
use confetti_store::Store;

use super::CommandResult;

pub async fn run(limit: usize) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("leaderboard", "config", error.to_string(), 2)
        }
    };

    let store = Store::open(&config.store.path).await;
    let standings = store.top_members(limit).await;

    if standings.is_empty() {
        return CommandResult::success("leaderboard", "no engagement recorded yet");
    }

    let mut lines = Vec::with_capacity(standings.len());
    for (index, standing) in standings.iter().enumerate() {
        let badges = if standing.entry.badges.is_empty() {
            String::new()
        } else {
            format!("  {}", standing.entry.badges.join(" "))
        };
        lines.push(format!(
            "{:>2}. {} — {} pts (quiz {}, reactions {}, messages {}){badges}",
            index + 1,
            standing.user_id,
            standing.score,
            standing.entry.quiz_correct,
            standing.entry.hot_take_reactions,
            standing.entry.messages_count,
        ));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}
