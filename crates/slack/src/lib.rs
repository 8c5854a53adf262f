//! Slack integration - the bot's chat-platform surface
//!
//! - **Chat API** (`api`) - narrow `ChatApi` trait over the Slack Web API:
//!   list channels, post a message (optionally threaded), read history
//! - **Channel Resolver** (`resolver`) - name -> id with an in-memory cache
//! - **Block Kit** (`blocks`) - rich message builders for every content type
//! - **Slash Commands** (`commands`) - `/confetti schedule`, `/confetti quiz`, ...
//! - **Events** (`events`) - channel messages, reactions, team joins
//! - **Socket Mode** (`socket`) - WebSocket event loop with reconnection
//!
//! The engine consumes only `ChatApi` and `ChannelResolver`; the rest is the
//! interactive surface. Handlers delegate real behavior to service traits so
//! the wiring (and tests) can swap implementations.

pub mod api;
pub mod blocks;
pub mod commands;
pub mod events;
pub mod resolver;
pub mod socket;
