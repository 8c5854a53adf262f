//! Confetti core - catalog, rotation, scheduling primitives, badge rules
//!
//! This crate holds the pure heart of the bot:
//! - **Catalog** (`catalog`) - typed content buckets loaded from JSON files
//! - **Rotation** (`rotation`) - unposted-first selection with random fallback
//! - **Schedule** (`schedule`) - weekly slots and parity-based bucket choice
//! - **Badges** (`badges`) - fixed threshold rules for engagement awards
//! - **Config** (`config`) - layered configuration with env overrides
//!
//! Nothing here performs I/O at runtime besides catalog/config loading at
//! startup; rotation and scheduling are pure functions over values supplied
//! by the caller, which keeps the invariants testable without a clock or a
//! chat platform.

pub mod badges;
pub mod catalog;
pub mod config;
pub mod rotation;
pub mod schedule;
