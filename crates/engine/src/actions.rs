use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc, Weekday};
use chrono_tz::Tz;
use confetti_core::catalog::{Bucket, Catalog};
use confetti_core::rotation::{pick_next, RotationError};
use confetti_core::schedule::{BucketChoice, Slot};
use confetti_slack::api::{ChatApi, ChatApiError, PostMessageRequest};
use confetti_slack::blocks;
use confetti_slack::resolver::{ChannelResolver, ResolveError};
use confetti_store::{PendingReveal, Store, StoreError};
use thiserror::Error;
use tracing::info;

use crate::dispatcher::{DispatchAction, ScheduleEntry, TickContext};
use crate::fetcher::{ConferenceFetcher, FetchError};
use crate::reveal::RevealScheduler;
use crate::tracker::EngagementTracker;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Rotation(#[from] RotationError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("post failed: {0}")]
    Post(#[from] ChatApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no talks are available to spotlight")]
    NoTalks,
}

/// Everything a scheduled action needs; built once at bootstrap and shared.
pub struct ActionDeps {
    pub catalog: Arc<Catalog>,
    pub store: Store,
    pub api: Arc<dyn ChatApi>,
    pub resolver: Arc<ChannelResolver>,
    pub tracker: EngagementTracker,
    pub reveals: RevealScheduler,
    pub fetcher: Arc<ConferenceFetcher>,
    /// Target channel name for all scheduled posts.
    pub channel: String,
    pub conference_url: String,
    pub quiz_reveal_delay: Duration,
}

impl ActionDeps {
    async fn post_to_channel(
        &self,
        message: blocks::MessageTemplate,
    ) -> Result<confetti_slack::api::PostedMessage, ActionError> {
        let channel_id = self.resolver.resolve(&self.channel).await?;
        let request = PostMessageRequest {
            channel: channel_id,
            text: message.fallback_text,
            blocks: Some(message.blocks),
            thread_ts: None,
        };
        Ok(self.api.post_message(request).await?)
    }
}

/// Rotate-and-post: select the next unposted item for the tick's bucket,
/// post it, and record it. The record is only written after a successful
/// post, so a failed tick leaves the item eligible for the next one. Posting
/// a quiz also schedules its answer reveal.
pub struct RotatePost {
    deps: Arc<ActionDeps>,
    choice: BucketChoice,
}

impl RotatePost {
    pub fn new(deps: Arc<ActionDeps>, choice: BucketChoice) -> Self {
        Self { deps, choice }
    }
}

#[async_trait]
impl DispatchAction for RotatePost {
    async fn run(&self, tick: TickContext) -> Result<(), ActionError> {
        let bucket = self.choice.for_date(tick.local_date);
        let posted = self.deps.store.posted_ids(bucket).await;
        let items = self.deps.catalog.items(bucket);
        let item = pick_next(bucket, items, &posted)?;

        let message = blocks::content_message(item);
        let posted_message = self.deps.post_to_channel(message).await?;

        self.deps
            .store
            .mark_posted(&item.id, bucket, &self.deps.channel, &posted_message.ts)
            .await?;
        info!(
            bucket = %bucket,
            content_id = %item.id,
            channel = %self.deps.channel,
            correlation_id = %tick.correlation_id,
            "posted scheduled content"
        );

        if bucket == Bucket::Quiz {
            self.deps
                .reveals
                .schedule(PendingReveal {
                    content_id: item.id.clone(),
                    channel_id: posted_message.channel,
                    message_ts: posted_message.ts,
                    reveal_at: Utc::now() + self.deps.quiz_reveal_delay,
                })
                .await?;
        }

        Ok(())
    }
}

/// Post a randomly chosen upcoming-talk teaser from the live agenda. Not a
/// catalog item, so nothing is recorded in rotation history.
pub struct SpeakerSpotlight {
    deps: Arc<ActionDeps>,
}

impl SpeakerSpotlight {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl DispatchAction for SpeakerSpotlight {
    async fn run(&self, tick: TickContext) -> Result<(), ActionError> {
        let talk = self.deps.fetcher.random_talk().await?.ok_or(ActionError::NoTalks)?;
        let message = blocks::spotlight_message(&talk, &self.deps.conference_url);
        self.deps.post_to_channel(message).await?;
        info!(
            title = %talk.title,
            correlation_id = %tick.correlation_id,
            "posted speaker spotlight"
        );
        Ok(())
    }
}

/// Compute and post the trailing-week engagement summary.
pub struct WeeklyWrap {
    deps: Arc<ActionDeps>,
}

impl WeeklyWrap {
    pub fn new(deps: Arc<ActionDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl DispatchAction for WeeklyWrap {
    async fn run(&self, tick: TickContext) -> Result<(), ActionError> {
        let stats = self.deps.tracker.weekly_stats(Utc::now()).await;
        let view = blocks::WeeklyWrapView {
            total_interactions: stats.total_engagement,
            top_contributors: stats
                .top_users
                .into_iter()
                .map(|user| (user.user_id, user.actions))
                .collect(),
        };
        self.deps.post_to_channel(blocks::weekly_wrap_message(&view)).await?;
        info!(correlation_id = %tick.correlation_id, "posted weekly wrap");
        Ok(())
    }
}

/// The fixed weekly table: one content slot per day at 09:30 local, the wrap
/// on Saturday morning, and a speaker spotlight on Sunday. Monday alternates
/// icebreakers and memes by ISO week parity.
pub fn default_entries(deps: Arc<ActionDeps>, timezone: Tz) -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry {
            name: "monday-icebreaker-or-meme",
            slot: Slot::new(30, 9, Weekday::Mon),
            timezone,
            action: Arc::new(RotatePost::new(
                deps.clone(),
                BucketChoice::WeekParity { odd: Bucket::Icebreaker, even: Bucket::Meme },
            )),
        },
        ScheduleEntry {
            name: "tuesday-hot-take",
            slot: Slot::new(30, 9, Weekday::Tue),
            timezone,
            action: Arc::new(RotatePost::new(deps.clone(), BucketChoice::Fixed(Bucket::HotTake))),
        },
        ScheduleEntry {
            name: "wednesday-this-or-that",
            slot: Slot::new(30, 9, Weekday::Wed),
            timezone,
            action: Arc::new(RotatePost::new(
                deps.clone(),
                BucketChoice::Fixed(Bucket::ThisOrThat),
            )),
        },
        ScheduleEntry {
            name: "thursday-quiz",
            slot: Slot::new(30, 9, Weekday::Thu),
            timezone,
            action: Arc::new(RotatePost::new(deps.clone(), BucketChoice::Fixed(Bucket::Quiz))),
        },
        ScheduleEntry {
            name: "friday-poll",
            slot: Slot::new(30, 9, Weekday::Fri),
            timezone,
            action: Arc::new(RotatePost::new(deps.clone(), BucketChoice::Fixed(Bucket::Poll))),
        },
        ScheduleEntry {
            name: "saturday-weekly-wrap",
            slot: Slot::new(0, 11, Weekday::Sat),
            timezone,
            action: Arc::new(WeeklyWrap::new(deps.clone())),
        },
        ScheduleEntry {
            name: "sunday-speaker-spotlight",
            slot: Slot::new(0, 11, Weekday::Sun),
            timezone,
            action: Arc::new(SpeakerSpotlight::new(deps)),
        },
    ]
}
