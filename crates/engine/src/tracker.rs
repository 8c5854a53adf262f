use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use confetti_core::badges::{earned_badges, CounterField};
use confetti_store::{ActionType, MemberStanding, Store, StoreError};
use tracing::info;

/// Trailing window for [`EngagementTracker::weekly_stats`].
const WEEKLY_WINDOW_DAYS: i64 = 7;
const WEEKLY_TOP_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserActions {
    pub user_id: String,
    pub actions: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklyStats {
    pub total_engagement: usize,
    pub top_users: Vec<UserActions>,
}

/// Records engagement into the store and keeps leaderboard counters and
/// badges up to date. Stateless besides the store handle; clone freely.
#[derive(Clone)]
pub struct EngagementTracker {
    store: Store,
}

impl EngagementTracker {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Track a top-level channel message. Returns any badges newly awarded.
    pub async fn track_message(&self, user_id: &str) -> Result<Vec<&'static str>, StoreError> {
        self.store.record_engagement(user_id, ActionType::Message, None).await?;
        self.bump(user_id, CounterField::MessagesCount).await
    }

    /// Track an emoji reaction; `content_id` is the reacted message's
    /// timestamp when the platform provides it.
    pub async fn track_reaction(
        &self,
        user_id: &str,
        content_id: Option<&str>,
    ) -> Result<Vec<&'static str>, StoreError> {
        self.store.record_engagement(user_id, ActionType::Reaction, content_id).await?;
        self.bump(user_id, CounterField::HotTakeReactions).await
    }

    /// Track a quiz answer. Appends the answer record and an engagement
    /// event either way; the `quiz_correct` counter only moves on a correct
    /// answer. Returns whether the answer was correct.
    pub async fn track_quiz_answer(
        &self,
        user_id: &str,
        quiz_id: &str,
        answer: &str,
        correct_answer: &str,
    ) -> Result<bool, StoreError> {
        let correct = answer == correct_answer;
        self.store.record_quiz_answer(quiz_id, user_id, answer, correct).await?;
        self.store.record_engagement(user_id, ActionType::QuizAnswer, Some(quiz_id)).await?;

        if correct {
            self.bump(user_id, CounterField::QuizCorrect).await?;
        }

        Ok(correct)
    }

    async fn bump(
        &self,
        user_id: &str,
        field: CounterField,
    ) -> Result<Vec<&'static str>, StoreError> {
        let entry = self.store.increment_counter(user_id, field).await?;

        let mut awarded = Vec::new();
        for badge in
            earned_badges(entry.quiz_correct, entry.hot_take_reactions, entry.messages_count)
        {
            if self.store.add_badge(user_id, badge).await? {
                info!(user_id, badge, "badge awarded");
                awarded.push(badge);
            }
        }
        Ok(awarded)
    }

    /// Engagement totals for the trailing seven days: overall event count
    /// and the five busiest users. Ties keep first-appearance order from
    /// the event log.
    pub async fn weekly_stats(&self, now: DateTime<Utc>) -> WeeklyStats {
        let cutoff = now - Duration::days(WEEKLY_WINDOW_DAYS);
        let events = self.store.events_since(cutoff).await;

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for event in &events {
            if !counts.contains_key(&event.user_id) {
                order.push(event.user_id.clone());
            }
            *counts.entry(event.user_id.clone()).or_insert(0) += 1;
        }

        let mut top_users: Vec<UserActions> = order
            .into_iter()
            .map(|user_id| {
                let actions = counts[&user_id];
                UserActions { user_id, actions }
            })
            .collect();
        top_users.sort_by(|a, b| b.actions.cmp(&a.actions));
        top_users.truncate(WEEKLY_TOP_LIMIT);

        WeeklyStats { total_engagement: events.len(), top_users }
    }

    pub async fn leaderboard(&self, limit: usize) -> Vec<MemberStanding> {
        self.store.top_members(limit).await
    }
}
