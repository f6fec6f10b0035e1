//! Foundation layer: the data model every other crate builds on.

pub mod error;
pub mod outgoing;
pub mod principal;
pub mod update;

pub use error::{TransportError, TransportResult};
pub use outgoing::{Button, InlineKeyboardButton, InlineKeyboardMarkup, Keyboard, OutgoingMessage};
pub use principal::{
    AnonymousPrincipal, BoxedPrincipal, Principal, RoleSet, SimplePrincipal, downcast_principal,
};
pub use update::{CallbackQuery, Chat, ChatId, Message, MessageId, Update, UpdateKind, User, UserId};
