//! Persistent state store - one JSON document, rewritten in full on every
//! mutation.
//!
//! The store exclusively owns all mutable bot state: posted-content records,
//! the quiz-answer log, the capped engagement event log, the per-user
//! leaderboard, and pending quiz reveals. Components hold cheap [`Store`]
//! clones and go through its operations; nothing outside this crate touches
//! the document directly.
//!
//! Writes are O(total state size), which is acceptable because state is
//! bounded: the engagement log is capped and the leaderboard grows with the
//! distinct-user count. A missing or corrupt file on startup loads as an
//! empty store with a warning, never a fatal error.

pub mod document;
mod store;

pub use document::{
    ActionType, EngagementEvent, LeaderboardEntry, MemberStanding, PendingReveal,
    PostedContentRecord, QuizAnswerRecord, StateDocument, ENGAGEMENT_LOG_CAP,
};
pub use store::{Store, StoreError, StoreSummary};
