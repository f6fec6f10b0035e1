//! Turning handler return values into outgoing messages.
//!
//! Handler functions may return any type implementing [`IntoReply`]:
//!
//! | Return type                         | Reply                                    |
//! |-------------------------------------|------------------------------------------|
//! | `()` / `None`                       | nothing is sent                          |
//! | [`OutgoingMessage`]                 | sent as-is                               |
//! | [`Keyboard`]                        | message with inline keyboard             |
//! | `String`, `&'static str`, numbers   | text message                             |
//! | `Result<T, E>`                      | `T`'s reply, or a handler failure        |
//!
//! Keyboard and text replies go to the conversation of the update. When the
//! route links responses, they quote the originating message.

use std::sync::Arc;

use tracing::debug;

use courier_core::{Keyboard, Message, OutgoingMessage};

use crate::context::UpdateContext;
use crate::error::{BoxError, DispatchError};

/// A handler's reply before it is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to send.
    None,
    /// A message the handler addressed itself.
    Native(OutgoingMessage),
    /// Text with an inline keyboard.
    Keyboard(Keyboard),
    /// Plain text.
    Text(String),
}

impl Reply {
    /// Addresses the reply to `conversation`.
    ///
    /// Returns `None` for [`Reply::None`]. [`Reply::Native`] messages are
    /// returned unchanged and `link` only applies to the other variants.
    pub fn address(self, conversation: &Message, link: bool) -> Option<OutgoingMessage> {
        let message = match self {
            Self::None => return None,
            Self::Native(message) => return Some(message),
            Self::Keyboard(keyboard) => {
                let markup = keyboard.build_markup();
                OutgoingMessage::new(conversation.chat_id(), keyboard.message).with_markup(markup)
            }
            Self::Text(text) => OutgoingMessage::new(conversation.chat_id(), text),
        };
        Some(if link {
            message.reply_to(conversation.message_id)
        } else {
            message
        })
    }

    fn needs_conversation(&self) -> bool {
        matches!(self, Self::Keyboard(_) | Self::Text(_))
    }
}

/// Conversion of handler return values into a [`Reply`].
pub trait IntoReply: Send {
    /// `false` for types that never carry a value. Fallback handlers must
    /// return such a type.
    const RETURNS_VALUE: bool = true;

    /// Converts `self` into a reply; errors become handler failures.
    fn into_reply(self) -> Result<Reply, BoxError>;
}

impl IntoReply for () {
    const RETURNS_VALUE: bool = false;

    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::None)
    }
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(self)
    }
}

impl IntoReply for OutgoingMessage {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Native(self))
    }
}

impl IntoReply for Keyboard {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Keyboard(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Text(self.to_owned()))
    }
}

macro_rules! impl_into_reply_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Result<Reply, BoxError> {
                    Ok(Reply::Text(self.to_string()))
                }
            }
        )*
    };
}

impl_into_reply_display!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

impl<T: IntoReply> IntoReply for Option<T> {
    const RETURNS_VALUE: bool = T::RETURNS_VALUE;

    fn into_reply(self) -> Result<Reply, BoxError> {
        match self {
            Some(value) => value.into_reply(),
            None => Ok(Reply::None),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError> + Send,
{
    const RETURNS_VALUE: bool = T::RETURNS_VALUE;

    fn into_reply(self) -> Result<Reply, BoxError> {
        match self {
            Ok(value) => value.into_reply(),
            Err(err) => Err(err.into()),
        }
    }
}

/// Addresses `reply` to the update's conversation and sends it.
///
/// Returns the message that was sent, if any.
pub(crate) async fn send_reply(
    ctx: &Arc<UpdateContext>,
    reply: Reply,
    link: bool,
) -> Result<Option<OutgoingMessage>, DispatchError> {
    let update = ctx.update();
    let message = if reply.needs_conversation() {
        let conversation = update
            .conversation()
            .ok_or(DispatchError::NoConversation(update.update_id))?;
        reply.address(conversation, link)
    } else {
        // Only `None` and `Native` end up here and neither reads the conversation.
        match reply {
            Reply::Native(message) => Some(message),
            _ => None,
        }
    };

    let Some(message) = message else {
        debug!("handler produced no reply");
        return Ok(None);
    };

    debug!(chat_id = message.chat_id, "sending reply");
    ctx.sender().send(&message).await?;
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Button;

    fn conversation() -> Message {
        Message::text(42, 100, 1, "hello")
    }

    #[test]
    fn test_none_produces_nothing() {
        assert_eq!(().into_reply().unwrap(), Reply::None);
        assert_eq!(Option::<String>::None.into_reply().unwrap(), Reply::None);
        assert_eq!(Reply::None.address(&conversation(), true), None);
    }

    #[test]
    fn test_text_reply_addressing() {
        let reply = "pong".into_reply().unwrap();
        let sent = reply.clone().address(&conversation(), false).unwrap();
        assert_eq!(sent.chat_id, 100);
        assert_eq!(sent.text, "pong");
        assert_eq!(sent.reply_to_message_id, None);

        let linked = reply.address(&conversation(), true).unwrap();
        assert_eq!(linked.reply_to_message_id, Some(42));
    }

    #[test]
    fn test_display_values_become_text() {
        assert_eq!(42i32.into_reply().unwrap(), Reply::Text("42".into()));
        assert_eq!(true.into_reply().unwrap(), Reply::Text("true".into()));
    }

    #[test]
    fn test_native_reply_unchanged() {
        let native = OutgoingMessage::new(7, "elsewhere");
        let sent = native.clone().into_reply().unwrap().address(&conversation(), true);
        assert_eq!(sent, Some(native));
    }

    #[test]
    fn test_keyboard_reply_is_chunked() {
        let keyboard = Keyboard::new(
            "Pick",
            vec![
                Button::new("A", "a"),
                Button::new("B", "b"),
                Button::new("C", "c"),
            ],
        )
        .columns(2);

        let sent = keyboard.into_reply().unwrap().address(&conversation(), false).unwrap();
        let markup = sent.reply_markup.unwrap();
        assert_eq!(sent.text, "Pick");
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1].len(), 1);
    }

    #[test]
    fn test_result_reply() {
        let ok: Result<&'static str, std::io::Error> = Ok("fine");
        assert_eq!(ok.into_reply().unwrap(), Reply::Text("fine".into()));

        let err: Result<String, BoxError> = Err("boom".into());
        assert_eq!(err.into_reply().unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_returns_value_flags() {
        assert!(!<() as IntoReply>::RETURNS_VALUE);
        assert!(!<Result<(), BoxError> as IntoReply>::RETURNS_VALUE);
        assert!(!<Option<()> as IntoReply>::RETURNS_VALUE);
        assert!(<String as IntoReply>::RETURNS_VALUE);
        assert!(<Result<Keyboard, BoxError> as IntoReply>::RETURNS_VALUE);
    }
}
