//! Inbound update model.
//!
//! An [`Update`] is one event delivered by the chat platform. Exactly one
//! [`UpdateKind`] is present per update: either a chat [`Message`] or a
//! [`CallbackQuery`] raised by pressing an inline keyboard button.
//!
//! The field names follow the Telegram Bot API so that updates can be
//! deserialized straight from `getUpdates` payloads:
//!
//! ```json
//! { "update_id": 7, "message": { "message_id": 1, "chat": { "id": 42 }, "text": "/start" } }
//! ```

use serde::{Deserialize, Serialize};

/// Identifier of a conversation (a private chat, group or channel).
pub type ChatId = i64;

/// Identifier of a message within a chat.
pub type MessageId = i64;

/// Identifier of a platform user.
pub type UserId = i64;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Whether the user is a bot account.
    #[serde(default)]
    pub is_bot: bool,
    /// First name as shown by the platform.
    #[serde(default)]
    pub first_name: String,
    /// Optional public username (without the leading `@`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    /// Creates a user with only an identifier set.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            is_bot: false,
            first_name: String::new(),
            username: None,
        }
    }
}

/// A conversation reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: ChatId,
    /// Chat type as reported by the platform ("private", "group", ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Chat {
    /// Creates a chat reference with only an identifier set.
    pub fn new(id: ChatId) -> Self {
        Self { id, kind: None }
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, unique within its chat.
    pub message_id: MessageId,
    /// The conversation the message belongs to.
    pub chat: Chat,
    /// Sender of the message. Absent for channel posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix timestamp of the message.
    #[serde(default)]
    pub date: i64,
    /// Text content. Absent for media-only messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Message {
    /// Creates a text message in `chat_id` sent by `user_id`.
    pub fn text(message_id: MessageId, chat_id: ChatId, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            message_id,
            chat: Chat::new(chat_id),
            from: Some(User::new(user_id)),
            date: 0,
            text: Some(text.into()),
        }
    }

    /// Returns the chat identifier of this message.
    pub fn chat_id(&self) -> ChatId {
        self.chat.id
    }
}

/// A callback raised by an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique query identifier.
    pub id: String,
    /// The user who pressed the button.
    pub from: User,
    /// The message the keyboard was attached to.
    ///
    /// Absent when the keyboard belonged to an inline-mode message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Opaque data associated with the pressed button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// The payload carried by an [`Update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// A new incoming message.
    #[serde(rename = "message")]
    Message(Message),
    /// A pressed inline keyboard button.
    #[serde(rename = "callback_query")]
    Callback(CallbackQuery),
}

/// One inbound event from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing update identifier.
    pub update_id: i64,
    /// The update payload.
    #[serde(flatten)]
    pub kind: UpdateKind,
}

impl Update {
    /// Creates a message update.
    pub fn message(update_id: i64, message: Message) -> Self {
        Self {
            update_id,
            kind: UpdateKind::Message(message),
        }
    }

    /// Creates a callback update.
    pub fn callback(update_id: i64, callback: CallbackQuery) -> Self {
        Self {
            update_id,
            kind: UpdateKind::Callback(callback),
        }
    }

    /// Returns the message if this is a message update.
    pub fn as_message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(message) => Some(message),
            UpdateKind::Callback(_) => None,
        }
    }

    /// Returns the callback query if this is a callback update.
    pub fn as_callback(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            UpdateKind::Callback(callback) => Some(callback),
            UpdateKind::Message(_) => None,
        }
    }

    /// Returns the platform user id of whoever triggered this update.
    pub fn sender_id(&self) -> Option<UserId> {
        match &self.kind {
            UpdateKind::Message(message) => message.from.as_ref().map(|u| u.id),
            UpdateKind::Callback(callback) => Some(callback.from.id),
        }
    }

    /// Returns the message a reply to this update should be addressed to.
    ///
    /// For messages this is the message itself, for callbacks the message
    /// the keyboard was attached to.
    pub fn conversation(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(message) => Some(message),
            UpdateKind::Callback(callback) => callback.message.as_ref(),
        }
    }

    /// Short name of the update kind, used in logs.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            UpdateKind::Message(_) => "message",
            UpdateKind::Callback(_) => "callback_query",
        }
    }
}
