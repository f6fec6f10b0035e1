//! # Courier Transport
//!
//! Bot API transport for the Courier bot framework.
//!
//! ## Features
//!
//! - `http-client`: [`TelegramApi`], a long-polling client implementing both
//!   [`Sender`](courier_core::Sender) and [`UpdateSource`](courier_core::UpdateSource)
//!
//! The wire format in [`api`] is always available, so other transports
//! (e.g. a webhook server) can reuse the decoding rules.
//!
//! ```text
//! ┌─────────────────────┐
//! │  courier-runtime    │  (one runner per bot)
//! ├─────────────────────┤
//! │  courier-core       │  (Sender / UpdateSource)
//! ├─────────────────────┤
//! │  courier-transport  │  <- This crate
//! ├─────────────────────┤
//! │  Bot API over HTTPS │
//! └─────────────────────┘
//! ```

pub mod api;

#[cfg(feature = "http-client")]
pub mod telegram;

pub use api::{ApiResponse, UpdateBatch, decode_updates};
#[cfg(feature = "http-client")]
pub use telegram::{TelegramApi, TelegramConfig};
