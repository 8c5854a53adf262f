use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use confetti_core::badges::CounterField;
use confetti_core::catalog::Bucket;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

use crate::document::{
    ActionType, EngagementEvent, LeaderboardEntry, MemberStanding, PendingReveal,
    PostedContentRecord, QuizAnswerRecord, StateDocument, ENGAGEMENT_LOG_CAP,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not write state document `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not serialize state document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Counts reported by [`Store::summary`] for health checks and the CLI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreSummary {
    pub posted_content: usize,
    pub quiz_answers: usize,
    pub engagement_events: usize,
    pub leaderboard_users: usize,
    pub pending_reveals: usize,
}

struct StoreInner {
    path: PathBuf,
    state: Mutex<StateDocument>,
}

/// Handle to the persistent state document.
///
/// Cloning is cheap; every clone shares the same in-memory state and file.
/// Mutations hold the internal lock across mutate-and-persist, so writers
/// serialize even on a multi-threaded runtime.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Open the store at `path`. A missing file is an empty store; a file
    /// that cannot be read or parsed is treated the same way, with a
    /// warning - corruption is recovered, never fatal.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<StateDocument>(&raw) {
                Ok(document) => document,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "state document is corrupt; starting from an empty store"
                    );
                    StateDocument::default()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => StateDocument::default(),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "state document is unreadable; starting from an empty store"
                );
                StateDocument::default()
            }
        };

        Self { inner: Arc::new(StoreInner { path, state: Mutex::new(state) }) }
    }

    pub async fn mark_posted(
        &self,
        content_id: &str,
        content_type: Bucket,
        channel: &str,
        message_ts: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.posted_content.insert(
            content_id.to_owned(),
            PostedContentRecord {
                content_type,
                posted_at: Utc::now(),
                channel: channel.to_owned(),
                message_ts: message_ts.to_owned(),
            },
        );
        self.persist(&state).await
    }

    /// Content ids already posted under a bucket, for rotation selection.
    pub async fn posted_ids(&self, content_type: Bucket) -> HashSet<String> {
        let state = self.inner.state.lock().await;
        state
            .posted_content
            .iter()
            .filter(|(_, record)| record.content_type == content_type)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub async fn posted_record(&self, content_id: &str) -> Option<PostedContentRecord> {
        let state = self.inner.state.lock().await;
        state.posted_content.get(content_id).cloned()
    }

    /// Look a posted item up by its platform message timestamp. Used by the
    /// reaction path to recognize answers on a posted quiz.
    pub async fn find_posted_by_ts(
        &self,
        message_ts: &str,
    ) -> Option<(String, PostedContentRecord)> {
        let state = self.inner.state.lock().await;
        state
            .posted_content
            .iter()
            .find(|(_, record)| record.message_ts == message_ts)
            .map(|(id, record)| (id.clone(), record.clone()))
    }

    pub async fn record_quiz_answer(
        &self,
        quiz_id: &str,
        user_id: &str,
        answer: &str,
        correct: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.quiz_answers.push(QuizAnswerRecord {
            quiz_id: quiz_id.to_owned(),
            user_id: user_id.to_owned(),
            answer: answer.to_owned(),
            correct,
            answered_at: Utc::now(),
        });
        self.persist(&state).await
    }

    pub async fn quiz_answers_for(&self, quiz_id: &str) -> Vec<QuizAnswerRecord> {
        let state = self.inner.state.lock().await;
        state.quiz_answers.iter().filter(|record| record.quiz_id == quiz_id).cloned().collect()
    }

    pub async fn record_engagement(
        &self,
        user_id: &str,
        action_type: ActionType,
        content_id: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record_engagement_at(user_id, action_type, content_id, Utc::now()).await
    }

    /// Append an engagement event with an explicit timestamp. The public
    /// seam exists so aggregate-window behavior can be exercised without a
    /// clock; production callers go through [`Store::record_engagement`].
    pub async fn record_engagement_at(
        &self,
        user_id: &str,
        action_type: ActionType,
        content_id: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.engagement.push(EngagementEvent {
            user_id: user_id.to_owned(),
            action_type,
            content_id: content_id.map(str::to_owned),
            created_at,
        });

        // Cap: keep the most recent half of the bound, plus the entry that
        // pushed the log over it.
        if state.engagement.len() > ENGAGEMENT_LOG_CAP {
            let keep = ENGAGEMENT_LOG_CAP / 2 + 1;
            let cut = state.engagement.len() - keep;
            state.engagement.drain(..cut);
        }

        self.persist(&state).await
    }

    pub async fn events_since(&self, cutoff: DateTime<Utc>) -> Vec<EngagementEvent> {
        let state = self.inner.state.lock().await;
        state.engagement.iter().filter(|event| event.created_at > cutoff).cloned().collect()
    }

    pub async fn engagement_len(&self) -> usize {
        self.inner.state.lock().await.engagement.len()
    }

    /// Increment one leaderboard counter, creating the entry on first use.
    /// Returns the updated entry so callers can evaluate badge thresholds.
    pub async fn increment_counter(
        &self,
        user_id: &str,
        field: CounterField,
    ) -> Result<LeaderboardEntry, StoreError> {
        let mut state = self.inner.state.lock().await;
        let entry = state.leaderboard.entry(user_id.to_owned()).or_default();
        match field {
            CounterField::QuizCorrect => entry.quiz_correct += 1,
            CounterField::HotTakeReactions => entry.hot_take_reactions += 1,
            CounterField::MessagesCount => entry.messages_count += 1,
        }
        let updated = entry.clone();
        self.persist(&state).await?;
        Ok(updated)
    }

    /// Add a badge to a user's set. Returns whether it was newly added;
    /// re-adding an existing badge is a no-op and skips the disk write.
    pub async fn add_badge(&self, user_id: &str, badge: &str) -> Result<bool, StoreError> {
        let mut state = self.inner.state.lock().await;
        let entry = state.leaderboard.entry(user_id.to_owned()).or_default();
        if entry.badges.iter().any(|existing| existing == badge) {
            return Ok(false);
        }
        entry.badges.push(badge.to_owned());
        self.persist(&state).await?;
        Ok(true)
    }

    pub async fn leaderboard_entry(&self, user_id: &str) -> Option<LeaderboardEntry> {
        let state = self.inner.state.lock().await;
        state.leaderboard.get(user_id).cloned()
    }

    /// Standings ordered by derived score, descending. Ties keep the
    /// document's user-id order (the sort is stable).
    pub async fn top_members(&self, limit: usize) -> Vec<MemberStanding> {
        let state = self.inner.state.lock().await;
        let mut standings: Vec<MemberStanding> = state
            .leaderboard
            .iter()
            .map(|(user_id, entry)| MemberStanding {
                user_id: user_id.clone(),
                score: entry.score(),
                entry: entry.clone(),
            })
            .collect();
        standings.sort_by(|a, b| b.score.cmp(&a.score));
        standings.truncate(limit);
        standings
    }

    pub async fn add_pending_reveal(&self, reveal: PendingReveal) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.pending_reveals.push(reveal);
        self.persist(&state).await
    }

    pub async fn remove_pending_reveal(
        &self,
        content_id: &str,
        message_ts: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state
            .pending_reveals
            .retain(|reveal| !(reveal.content_id == content_id && reveal.message_ts == message_ts));
        self.persist(&state).await
    }

    pub async fn pending_reveals(&self) -> Vec<PendingReveal> {
        self.inner.state.lock().await.pending_reveals.clone()
    }

    pub async fn summary(&self) -> StoreSummary {
        let state = self.inner.state.lock().await;
        StoreSummary {
            posted_content: state.posted_content.len(),
            quiz_answers: state.quiz_answers.len(),
            engagement_events: state.engagement.len(),
            leaderboard_users: state.leaderboard.len(),
            pending_reveals: state.pending_reveals.len(),
        }
    }

    async fn persist(&self, state: &StateDocument) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.inner.path, raw)
            .await
            .map_err(|source| StoreError::Write { path: self.inner.path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use confetti_core::badges::CounterField;
    use confetti_core::catalog::Bucket;
    use tempfile::TempDir;

    use super::Store;
    use crate::document::{ActionType, PendingReveal, ENGAGEMENT_LOG_CAP};

    async fn temp_store(dir: &TempDir) -> Store {
        Store::open(dir.path().join("state.json")).await
    }

    #[tokio::test]
    async fn missing_file_opens_as_empty_store() {
        let dir = TempDir::new().expect("tempdir");
        let store = temp_store(&dir).await;

        let summary = store.summary().await;
        assert_eq!(summary.posted_content, 0);
        assert_eq!(summary.leaderboard_users, 0);
    }

    #[tokio::test]
    async fn corrupt_file_opens_as_empty_store() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not valid json!").expect("write garbage");

        let store = Store::open(&path).await;
        assert_eq!(store.summary().await.posted_content, 0);

        // The store stays usable: the next mutation rewrites the file.
        store.mark_posted("q1", Bucket::Quiz, "daily-buzz", "1.0").await.expect("mark posted");
        let reopened = Store::open(&path).await;
        assert_eq!(reopened.summary().await.posted_content, 1);
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        let store = Store::open(&path).await;
        store.mark_posted("ht1", Bucket::HotTake, "daily-buzz", "2.0").await.expect("mark");
        store
            .record_engagement("U1", ActionType::Message, None)
            .await
            .expect("record engagement");
        store.increment_counter("U1", CounterField::MessagesCount).await.expect("increment");

        let reopened = Store::open(&path).await;
        assert_eq!(reopened.posted_ids(Bucket::HotTake).await.len(), 1);
        assert_eq!(reopened.engagement_len().await, 1);
        let entry = reopened.leaderboard_entry("U1").await.expect("entry");
        assert_eq!(entry.messages_count, 1);
    }

    #[tokio::test]
    async fn posted_ids_filter_by_bucket() {
        let dir = TempDir::new().expect("tempdir");
        let store = temp_store(&dir).await;

        store.mark_posted("q1", Bucket::Quiz, "daily-buzz", "1.0").await.expect("mark");
        store.mark_posted("p1", Bucket::Poll, "daily-buzz", "1.1").await.expect("mark");

        let quiz_ids = store.posted_ids(Bucket::Quiz).await;
        assert!(quiz_ids.contains("q1"));
        assert!(!quiz_ids.contains("p1"));
    }

    #[tokio::test]
    async fn engagement_log_truncates_to_half_plus_new_entry() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        // Seed a document already at the cap; one insert then overflows it.
        let base = Utc::now() - Duration::hours(1);
        let mut document = crate::document::StateDocument::default();
        for index in 0..ENGAGEMENT_LOG_CAP {
            document.engagement.push(crate::document::EngagementEvent {
                user_id: format!("U{index}"),
                action_type: ActionType::Message,
                content_id: None,
                created_at: base + Duration::seconds(index as i64),
            });
        }
        std::fs::write(&path, serde_json::to_vec(&document).expect("serialize seed"))
            .expect("write seed");

        let store = Store::open(&path).await;
        assert_eq!(store.engagement_len().await, ENGAGEMENT_LOG_CAP);

        store
            .record_engagement_at("U-overflow", ActionType::Message, None, Utc::now())
            .await
            .expect("record overflow");

        assert_eq!(store.engagement_len().await, ENGAGEMENT_LOG_CAP / 2 + 1);

        let recent = store.events_since(base - Duration::hours(1)).await;
        assert_eq!(recent.last().expect("latest event").user_id, "U-overflow");
        assert_eq!(
            recent.first().expect("oldest surviving event").user_id,
            format!("U{}", ENGAGEMENT_LOG_CAP / 2),
            "older half of the log is discarded"
        );
    }

    #[tokio::test]
    async fn badge_insert_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let store = temp_store(&dir).await;

        assert!(store.add_badge("U1", "Quiz Master 🧠").await.expect("first add"));
        assert!(!store.add_badge("U1", "Quiz Master 🧠").await.expect("second add"));

        let entry = store.leaderboard_entry("U1").await.expect("entry");
        assert_eq!(entry.badges, vec!["Quiz Master 🧠"]);
    }

    #[tokio::test]
    async fn top_members_rank_by_derived_score() {
        let dir = TempDir::new().expect("tempdir");
        let store = temp_store(&dir).await;

        // U-quiz: 2 correct answers -> score 6. U-chatty: 5 messages -> 5.
        for _ in 0..2 {
            store.increment_counter("U-quiz", CounterField::QuizCorrect).await.expect("inc");
        }
        for _ in 0..5 {
            store.increment_counter("U-chatty", CounterField::MessagesCount).await.expect("inc");
        }

        let standings = store.top_members(10).await;
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].user_id, "U-quiz");
        assert_eq!(standings[0].score, 6);
        assert_eq!(standings[1].user_id, "U-chatty");
        assert_eq!(standings[1].score, 5);
    }

    #[tokio::test]
    async fn pending_reveals_round_trip_and_remove() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");
        let store = Store::open(&path).await;

        let reveal = PendingReveal {
            content_id: "q1".to_owned(),
            channel_id: "C1".to_owned(),
            message_ts: "3.0".to_owned(),
            reveal_at: Utc::now() + Duration::hours(4),
        };
        store.add_pending_reveal(reveal.clone()).await.expect("add reveal");

        let reopened = Store::open(&path).await;
        assert_eq!(reopened.pending_reveals().await, vec![reveal.clone()]);

        reopened.remove_pending_reveal("q1", "3.0").await.expect("remove");
        assert!(reopened.pending_reveals().await.is_empty());
    }

    #[tokio::test]
    async fn quiz_answers_are_appended_per_quiz() {
        let dir = TempDir::new().expect("tempdir");
        let store = temp_store(&dir).await;

        store.record_quiz_answer("q1", "U1", "A", true).await.expect("record");
        store.record_quiz_answer("q1", "U2", "B", false).await.expect("record");
        store.record_quiz_answer("q2", "U1", "C", true).await.expect("record");

        let answers = store.quiz_answers_for("q1").await;
        assert_eq!(answers.len(), 2);
        assert!(answers[0].correct);
        assert!(!answers[1].correct);
    }
}
