//! Outgoing message payloads and inline keyboards.
//!
//! [`OutgoingMessage`] mirrors the Telegram `sendMessage` parameters and is
//! the platform-native response type. [`Keyboard`] is the minimal
//! text-plus-buttons abstraction handlers can return instead of building
//! the markup themselves.

use serde::{Deserialize, Serialize};

use crate::foundation::update::{ChatId, MessageId};

/// One button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    /// Label shown on the button.
    pub text: String,
    /// Data delivered in the callback query when the button is pressed.
    pub callback_data: String,
}

/// An inline keyboard attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    /// Rows of buttons.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// A message to be sent through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target conversation.
    pub chat_id: ChatId,
    /// Message text.
    pub text: String,
    /// Optional inline keyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    /// Message this one replies to, if threaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<MessageId>,
}

impl OutgoingMessage {
    /// Creates a plain text message.
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_markup: None,
            reply_to_message_id: None,
        }
    }

    /// Attaches an inline keyboard.
    pub fn with_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    /// Marks the message as a reply to `message_id`.
    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }
}

/// A labelled action of a [`Keyboard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Label shown to the user.
    pub text: String,
    /// Callback data sent back when pressed.
    pub data: String,
}

impl Button {
    /// Creates a button.
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// A text message with a grid of buttons.
///
/// Buttons are laid out row by row, `columns` buttons per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    /// The message text shown above the buttons.
    pub message: String,
    /// Buttons in display order.
    pub keys: Vec<Button>,
    /// Buttons per row. Always at least 1.
    pub columns: usize,
}

impl Keyboard {
    /// Creates a single-column keyboard.
    pub fn new(message: impl Into<String>, keys: Vec<Button>) -> Self {
        Self {
            message: message.into(),
            keys,
            columns: 1,
        }
    }

    /// Sets the number of buttons per row.
    pub fn columns(mut self, columns: usize) -> Self {
        self.columns = columns.max(1);
        self
    }

    /// Adds a button.
    pub fn button(mut self, text: impl Into<String>, data: impl Into<String>) -> Self {
        self.keys.push(Button::new(text, data));
        self
    }

    /// Builds the inline keyboard markup.
    pub fn build_markup(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup {
            inline_keyboard: self
                .keys
                .chunks(self.columns.max(1))
                .map(|row| {
                    row.iter()
                        .map(|b| InlineKeyboardButton {
                            text: b.text.clone(),
                            callback_data: b.data.clone(),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_chunks_by_columns() {
        let keyboard = Keyboard::new("pick one", Vec::new())
            .button("a", "1")
            .button("b", "2")
            .button("c", "3")
            .columns(2);

        let markup = keyboard.build_markup();
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].callback_data, "3");
    }

    #[test]
    fn test_zero_columns_is_clamped() {
        let keyboard = Keyboard::new("x", vec![Button::new("a", "1")]).columns(0);
        assert_eq!(keyboard.columns, 1);
        assert_eq!(keyboard.build_markup().inline_keyboard.len(), 1);
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let json = serde_json::to_value(OutgoingMessage::new(5, "hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "chat_id": 5, "text": "hi" }));
    }
}
