//! Outbound side of the transport boundary.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::error::TransportResult;
use crate::foundation::outgoing::OutgoingMessage;
use crate::foundation::update::{ChatId, Message, MessageId};

/// Sends replies and edits messages on behalf of one bot identity.
///
/// Implemented by the platform transport. The dispatch core only needs two
/// operations: delivering a message and removing the inline keyboard of a
/// message after one of its buttons was handled.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Sends `message` and returns the message as delivered.
    async fn send(&self, message: &OutgoingMessage) -> TransportResult<Message>;

    /// Removes the inline keyboard from a previously sent message.
    async fn strip_keyboard(&self, chat_id: ChatId, message_id: MessageId) -> TransportResult<()>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared sender trait object.
pub type BoxedSender = Arc<dyn Sender>;

/// Attempts to downcast a [`BoxedSender`] to a concrete transport type.
///
/// This lets handlers reach platform-specific APIs the [`Sender`] trait does
/// not cover.
pub fn downcast_sender<T: Sender + 'static>(sender: BoxedSender) -> Option<Arc<T>> {
    Arc::downcast::<T>(sender.as_any()).ok()
}
