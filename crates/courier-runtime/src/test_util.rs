//! In-memory transports for unit tests.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use courier_core::{
    BotCredentials, ChatId, Message, MessageId, OutgoingMessage, Sender, TransportResult, Update,
    UpdateSource,
};
use courier_framework::{Controller, ControllerBinder, Dispatcher, HandlerFunction, OnMessage};

/// Accepts every send.
#[derive(Default)]
pub struct NullSender;

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

/// Hands out scripted poll results, then cancels `drained` and waits forever.
pub struct ScriptedSource {
    batches: Mutex<VecDeque<TransportResult<Vec<Update>>>>,
    polls: AtomicUsize,
    drained: CancellationToken,
}

impl ScriptedSource {
    pub fn new(
        batches: impl IntoIterator<Item = TransportResult<Vec<Update>>>,
        drained: CancellationToken,
    ) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().collect()),
            polls: AtomicUsize::new(0),
            drained,
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn next_updates(&self) -> TransportResult<Vec<Update>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().await.pop_front();
        match next {
            Some(batch) => batch,
            None => {
                self.drained.cancel();
                futures::future::pending().await
            }
        }
    }
}

/// A text message update from user 1000 in chat 100.
pub fn message_update(update_id: i64, text: &str) -> Update {
    Update::message(update_id, Message::text(update_id, 100, 1000, text))
}

/// A controller answering `ping` with `pong`.
pub fn ping_controller(bot: &str) -> Controller {
    Controller::new("ping")
        .bot(bot)
        .function(HandlerFunction::new("ping", |_| async { "pong" }).on_message(OnMessage::new("ping")))
}

/// A dispatcher for the default bot with [`ping_controller`].
pub fn ping_dispatcher() -> Dispatcher {
    let binding = ControllerBinder::new()
        .with(ping_controller(""))
        .bind_bot("", BotCredentials::new("1:test", "test_bot"))
        .expect("ping controller binds");
    Dispatcher::new(binding, Arc::new(NullSender))
}
