use std::sync::Arc;

use chrono::Utc;
use confetti_core::catalog::{Bucket, Catalog};
use confetti_slack::api::{ChatApi, PostMessageRequest};
use confetti_slack::blocks;
use confetti_store::{PendingReveal, Store, StoreError};
use tracing::{info, warn};

/// Schedules one-shot quiz-answer reveals.
///
/// A scheduled reveal is persisted before its timer is armed, so reveals
/// survive a process restart: `rearm_pending` re-arms whatever is
/// outstanding at startup and overdue reveals fire immediately. Firing is a
/// single attempt; a platform error is logged and swallowed, and the
/// pending record is removed either way.
#[derive(Clone)]
pub struct RevealScheduler {
    inner: Arc<RevealInner>,
}

struct RevealInner {
    api: Arc<dyn ChatApi>,
    store: Store,
    catalog: Arc<Catalog>,
}

impl RevealScheduler {
    pub fn new(api: Arc<dyn ChatApi>, store: Store, catalog: Arc<Catalog>) -> Self {
        Self { inner: Arc::new(RevealInner { api, store, catalog }) }
    }

    /// Persist `reveal` and arm its timer.
    pub async fn schedule(&self, reveal: PendingReveal) -> Result<(), StoreError> {
        self.inner.store.add_pending_reveal(reveal.clone()).await?;
        info!(
            content_id = %reveal.content_id,
            reveal_at = %reveal.reveal_at,
            "quiz reveal scheduled"
        );
        self.arm(reveal);
        Ok(())
    }

    /// Re-arm every reveal still pending in the store. Called once at
    /// startup; returns how many were armed.
    pub async fn rearm_pending(&self) -> usize {
        let pending = self.inner.store.pending_reveals().await;
        for reveal in &pending {
            info!(
                content_id = %reveal.content_id,
                reveal_at = %reveal.reveal_at,
                "re-arming pending quiz reveal"
            );
            self.arm(reveal.clone());
        }
        pending.len()
    }

    fn arm(&self, reveal: PendingReveal) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let wait = (reveal.reveal_at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            scheduler.fire(reveal).await;
        });
    }

    async fn fire(&self, reveal: PendingReveal) {
        match self
            .inner
            .catalog
            .find(Bucket::Quiz, &reveal.content_id)
            .and_then(|item| item.quiz())
        {
            Some(quiz) => {
                let message = blocks::quiz_reveal_message(quiz);
                let request = PostMessageRequest {
                    channel: reveal.channel_id.clone(),
                    text: message.fallback_text.clone(),
                    blocks: Some(message.blocks),
                    thread_ts: Some(reveal.message_ts.clone()),
                };
                match self.inner.api.post_message(request).await {
                    Ok(_) => {
                        info!(content_id = %reveal.content_id, "quiz answer revealed")
                    }
                    Err(error) => warn!(
                        content_id = %reveal.content_id,
                        error = %error,
                        "quiz reveal post failed; reveal is dropped"
                    ),
                }
            }
            None => warn!(
                content_id = %reveal.content_id,
                "quiz vanished from the catalog; reveal is dropped"
            ),
        }

        if let Err(error) =
            self.inner.store.remove_pending_reveal(&reveal.content_id, &reveal.message_ts).await
        {
            warn!(
                content_id = %reveal.content_id,
                error = %error,
                "failed to clear fired reveal from the store"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use confetti_core::catalog::{Bucket, Catalog, ContentItem, ContentPayload, QuizContent};
    use confetti_slack::api::{
        ChatApi, ChatApiError, ChannelInfo, HistoryMessage, PostMessageRequest, PostedMessage,
    };
    use confetti_store::{PendingReveal, Store};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    use super::RevealScheduler;

    #[derive(Default)]
    struct CapturingApi {
        posts: Mutex<Vec<PostMessageRequest>>,
    }

    #[async_trait]
    impl ChatApi for CapturingApi {
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
            let channel = request.channel.clone();
            self.posts.lock().await.push(request);
            Ok(PostedMessage { channel, ts: "9.9".to_owned() })
        }

        async fn read_history(
            &self,
            _channel: &str,
            _limit: u32,
        ) -> Result<Vec<HistoryMessage>, ChatApiError> {
            Ok(Vec::new())
        }
    }

    fn quiz_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_buckets([(
                Bucket::Quiz,
                vec![ContentItem {
                    id: "q1".to_owned(),
                    payload: ContentPayload::Quiz(QuizContent {
                        question: "Which port does HTTPS use?".to_owned(),
                        options: vec!["80".to_owned(), "443".to_owned()],
                        answer: 1,
                        explanation: None,
                    }),
                }],
            )])
            .expect("catalog"),
        )
    }

    fn reveal_for(content_id: &str, reveal_at: chrono::DateTime<Utc>) -> PendingReveal {
        PendingReveal {
            content_id: content_id.to_owned(),
            channel_id: "C1".to_owned(),
            message_ts: "5.5".to_owned(),
            reveal_at,
        }
    }

    /// Wait (bounded) until the armed reveal tasks have run.
    async fn drain_timers() {
        tokio::time::sleep(StdDuration::from_millis(300)).await;
    }

    #[tokio::test]
    async fn scheduled_reveal_fires_threaded_and_clears_its_record() {
        let dir = TempDir::new().expect("tempdir");
        let store = Store::open(dir.path().join("state.json")).await;
        let api = Arc::new(CapturingApi::default());
        let scheduler = RevealScheduler::new(api.clone(), store.clone(), quiz_catalog());

        scheduler
            .schedule(reveal_for("q1", Utc::now() + Duration::milliseconds(50)))
            .await
            .expect("schedule");
        assert_eq!(store.pending_reveals().await.len(), 1, "reveal persisted before firing");

        drain_timers().await;

        let posts = api.posts.lock().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel, "C1");
        assert_eq!(posts[0].thread_ts.as_deref(), Some("5.5"), "reveal threads on the quiz post");
        assert_eq!(posts[0].text, "Answer: 443");
        drop(posts);

        assert!(store.pending_reveals().await.is_empty(), "record removed after firing");
    }

    #[tokio::test]
    async fn rearm_fires_overdue_reveals_immediately() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");

        // A reveal was scheduled, then the process "restarted" before it
        // fired.
        let store = Store::open(&path).await;
        store
            .add_pending_reveal(reveal_for("q1", Utc::now() - Duration::minutes(30)))
            .await
            .expect("persist");

        let reopened = Store::open(&path).await;
        let api = Arc::new(CapturingApi::default());
        let scheduler = RevealScheduler::new(api.clone(), reopened.clone(), quiz_catalog());

        let armed = scheduler.rearm_pending().await;
        assert_eq!(armed, 1);

        drain_timers().await;

        assert_eq!(api.posts.lock().await.len(), 1, "overdue reveal fires right away");
        assert!(reopened.pending_reveals().await.is_empty());
    }

    #[tokio::test]
    async fn missing_quiz_drops_the_reveal_without_posting() {
        let dir = TempDir::new().expect("tempdir");
        let store = Store::open(dir.path().join("state.json")).await;
        let api = Arc::new(CapturingApi::default());
        let scheduler = RevealScheduler::new(api.clone(), store.clone(), quiz_catalog());

        scheduler
            .schedule(reveal_for("q-unknown", Utc::now() + Duration::milliseconds(50)))
            .await
            .expect("schedule");

        drain_timers().await;

        assert!(api.posts.lock().await.is_empty());
        assert!(store.pending_reveals().await.is_empty(), "record still cleared");
    }
}
