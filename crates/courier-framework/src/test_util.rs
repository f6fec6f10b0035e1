use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{
    CallbackQuery, ChatId, Message, MessageId, OutgoingMessage, Sender, TransportResult, Update, User,
};

/// A sender that accepts everything and records nothing.
pub(crate) struct NullSender;

#[async_trait]
impl Sender for NullSender {
    async fn send(&self, message: &OutgoingMessage) -> TransportResult<Message> {
        Ok(Message::text(1, message.chat_id, 0, message.text.clone()))
    }

    async fn strip_keyboard(&self, _chat_id: ChatId, _message_id: MessageId) -> TransportResult<()> {
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) fn message_update(update_id: i64, text: &str) -> Update {
    Update::message(update_id, Message::text(10, 100, 1000, text))
}

pub(crate) fn callback_update(update_id: i64, data: &str) -> Update {
    Update::callback(
        update_id,
        CallbackQuery {
            id: format!("cb-{update_id}"),
            from: User::new(1000),
            message: Some(Message::text(10, 100, 0, "pick one")),
            data: Some(data.to_owned()),
        },
    )
}
