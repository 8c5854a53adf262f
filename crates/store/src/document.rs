use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use confetti_core::catalog::Bucket;
use serde::{Deserialize, Serialize};

/// Upper bound on the engagement event log. When an insert pushes the log
/// past this bound it is truncated to the most recent half plus the entry
/// that triggered the truncation, so only the trailing-week aggregate window
/// is guaranteed correct.
pub const ENGAGEMENT_LOG_CAP: usize = 10_000;

/// Record of a successfully posted catalog item, keyed by content id.
/// Written by the dispatcher after a successful post; never deleted, so the
/// rotation history spans the lifetime of the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedContentRecord {
    #[serde(rename = "type")]
    pub content_type: Bucket,
    pub posted_at: DateTime<Utc>,
    pub channel: String,
    pub message_ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswerRecord {
    pub quiz_id: String,
    pub user_id: String,
    pub answer: String,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Message,
    Reaction,
    QuizAnswer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub user_id: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub quiz_correct: u64,
    #[serde(default)]
    pub hot_take_reactions: u64,
    #[serde(default)]
    pub messages_count: u64,
    #[serde(default)]
    pub badges: Vec<String>,
}

impl LeaderboardEntry {
    /// Derived leaderboard score; computed on read, never stored.
    pub fn score(&self) -> u64 {
        3 * self.quiz_correct + self.hot_take_reactions + self.messages_count
    }
}

/// A leaderboard entry paired with its user and derived score, as returned
/// by ranking reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberStanding {
    pub user_id: String,
    pub entry: LeaderboardEntry,
    pub score: u64,
}

/// A quiz reveal that has been scheduled but not yet fired. Persisted so a
/// restart can re-arm outstanding reveals instead of silently dropping them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReveal {
    pub content_id: String,
    pub channel_id: String,
    pub message_ts: String,
    pub reveal_at: DateTime<Utc>,
}

/// The whole persisted document. Every top-level key defaults when absent
/// so documents written by older versions keep loading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub posted_content: BTreeMap<String, PostedContentRecord>,
    #[serde(default)]
    pub quiz_answers: Vec<QuizAnswerRecord>,
    #[serde(default)]
    pub engagement: Vec<EngagementEvent>,
    #[serde(default)]
    pub leaderboard: BTreeMap<String, LeaderboardEntry>,
    #[serde(default)]
    pub pending_reveals: Vec<PendingReveal>,
}
