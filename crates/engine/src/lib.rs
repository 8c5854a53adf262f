//! The scheduling and engagement engine.
//!
//! - **Tracker** (`tracker`) - engagement events, leaderboard counters,
//!   idempotent badge awards, weekly stats
//! - **Dispatcher** (`dispatcher`) - fixed weekly schedule table driven by a
//!   minute-aligned tick loop; actions fire independently
//! - **Actions** (`actions`) - rotate-and-post, speaker spotlight, weekly wrap
//! - **Reveal** (`reveal`) - durable one-shot quiz-answer reveals
//! - **Fetcher** (`fetcher`) - live agenda/speaker data with a file cache
//!
//! Every scheduled action and reveal callback is a catch-and-log boundary:
//! failures are operator-visible only and nothing is retried within a tick.

pub mod actions;
pub mod dispatcher;
pub mod fetcher;
pub mod reveal;
pub mod tracker;
