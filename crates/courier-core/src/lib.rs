//! # Courier Core
//!
//! Foundation types for the Courier bot dispatch framework.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! The data model shared by every crate:
//! - **Updates**: inbound events ([`Update`], [`Message`], [`CallbackQuery`])
//! - **Principals**: resolved user identities carrying roles ([`Principal`], [`RoleSet`])
//! - **Outgoing payloads**: replies and inline keyboards ([`OutgoingMessage`], [`Keyboard`])
//!
//! ### Integration Layer
//!
//! The transport boundary:
//! - **Outbound**: [`Sender`] delivers replies and strips keyboards
//! - **Inbound**: [`UpdateSource`] yields ordered batches of updates
//! - **Identity**: [`BotCredentials`] per bot
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌───────────┐
//! │ UpdateSource │────▶│ Dispatcher │────▶│  Handler  │
//! │  (platform)  │     │ (framework)│     └─────┬─────┘
//! └──────────────┘     └─────┬──────┘           │ reply
//!                            ▼                  │
//!                      ┌──────────┐             │
//!                      │  Sender  │◀────────────┘
//!                      └──────────┘
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::{
    AnonymousPrincipal, BoxedPrincipal, Button, CallbackQuery, Chat, ChatId, InlineKeyboardButton,
    InlineKeyboardMarkup, Keyboard, Message, MessageId, OutgoingMessage, Principal, RoleSet,
    SimplePrincipal, TransportError, TransportResult, Update, UpdateKind, User, UserId,
    downcast_principal,
};
pub use integration::{
    BotCredentials, BoxedSender, DEFAULT_BOT, Sender, UpdateSource, downcast_sender,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
