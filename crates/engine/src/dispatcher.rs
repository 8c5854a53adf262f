use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use confetti_core::schedule::Slot;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::actions::ActionError;

/// What an action learns about the tick that fired it: the calendar date in
/// the entry's timezone (drives parity bucket choices) and a correlation id
/// for the log trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickContext {
    pub local_date: NaiveDate,
    pub correlation_id: String,
}

#[async_trait]
pub trait DispatchAction: Send + Sync {
    async fn run(&self, tick: TickContext) -> Result<(), ActionError>;
}

/// One row of the fixed schedule table, registered once at startup.
#[derive(Clone)]
pub struct ScheduleEntry {
    pub name: &'static str,
    pub slot: Slot,
    pub timezone: Tz,
    pub action: Arc<dyn DispatchAction>,
}

pub struct Dispatcher {
    entries: Vec<ScheduleEntry>,
}

impl Dispatcher {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self { entries }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries whose slot matches `now` evaluated in each entry's own
    /// timezone. Pure with respect to the clock, so firing logic is
    /// testable without the tick loop.
    pub fn matching_entries(&self, now: DateTime<Utc>) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.slot.matches(&now.with_timezone(&entry.timezone)))
            .collect()
    }

    /// Drive the schedule until `shutdown` flips to true. Each matching
    /// entry's action is spawned onto the runtime, so a slow action never
    /// delays other entries or the next tick. In-flight actions are allowed
    /// to finish before this returns.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(entries = self.entries.len(), "dispatcher started");
        let mut inflight: JoinSet<()> = JoinSet::new();
        let mut last_minute: Option<i64> = None;

        loop {
            let delay = duration_until_next_minute(Utc::now());
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let now = Utc::now();
            let minute = now.timestamp() / 60;
            if last_minute == Some(minute) {
                continue;
            }
            last_minute = Some(minute);

            for entry in self.matching_entries(now) {
                let action = Arc::clone(&entry.action);
                let name = entry.name;
                let tick = TickContext {
                    local_date: now.with_timezone(&entry.timezone).date_naive(),
                    correlation_id: Uuid::new_v4().to_string(),
                };
                info!(entry = name, correlation_id = %tick.correlation_id, "schedule entry fired");
                inflight.spawn(async move {
                    if let Err(error) = action.run(tick.clone()).await {
                        warn!(
                            entry = name,
                            correlation_id = %tick.correlation_id,
                            error = %error,
                            "scheduled action failed; will not retry this tick"
                        );
                    }
                });
            }

            // Reap finished actions so the set stays small.
            while inflight.try_join_next().is_some() {}
        }

        info!(in_flight = inflight.len(), "dispatcher stopping; draining in-flight actions");
        while inflight.join_next().await.is_some() {}
    }
}

/// Time until the next wall-clock minute boundary.
fn duration_until_next_minute(now: DateTime<Utc>) -> Duration {
    let seconds_into_minute = u64::from(now.second());
    let nanos = now.timestamp_subsec_nanos() % 1_000_000_000;
    let whole = Duration::from_secs(60 - seconds_into_minute);
    whole.saturating_sub(Duration::from_nanos(u64::from(nanos)))
}
