//! Bound handlers.
//!
//! A [`HandlerDefinition`] is one route of one handler function after
//! binding: its kind-specific settings, priority, pre-computed parameter
//! mappings, authorization requirements and the erased function itself.
//!
//! Three kinds exist:
//!
//! - **Message** handlers apply to message updates whose text fully matches
//!   the pattern.
//! - **Callback** handlers apply to callback updates whose data fully
//!   matches the pattern. Unless told to keep it, they remove the inline
//!   keyboard of the originating message after the function succeeds.
//! - **Fallback** handlers apply to every update and run only when no other
//!   handler applied. Their priority is always [`FALLBACK_PRIORITY`].

mod function;
mod pattern;

pub use function::{BoxedHandlerFn, HandlerFn, HandlerFuture, into_handler_fn};
pub use pattern::RoutePattern;

pub(crate) use function::{call_guarded, panic_message};

use std::fmt;
use std::sync::Arc;

use regex::Captures;
use tracing::{debug, warn};

use courier_core::{OutgoingMessage, Principal, Update};

use crate::auth::Authorization;
use crate::context::UpdateContext;
use crate::error::DispatchError;
use crate::param::{Arguments, ParameterMapping, RouteKind};
use crate::response::send_reply;

/// Priority of fallback handlers; they sort after everything else.
pub const FALLBACK_PRIORITY: i32 = i32::MAX;

/// Kind-specific settings of a bound handler.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Matches message text.
    Message {
        pattern: RoutePattern,
        link_response: bool,
    },
    /// Matches callback data.
    Callback {
        pattern: RoutePattern,
        keep_keyboard: bool,
    },
    /// Matches everything.
    Fallback { link_response: bool },
}

impl HandlerKind {
    /// The route kind.
    pub fn route(&self) -> RouteKind {
        match self {
            Self::Message { .. } => RouteKind::Message,
            Self::Callback { .. } => RouteKind::Callback,
            Self::Fallback { .. } => RouteKind::Fallback,
        }
    }
}

/// One bound route of a handler function.
#[derive(Clone)]
pub struct HandlerDefinition {
    name: String,
    kind: HandlerKind,
    priority: i32,
    mappings: Vec<ParameterMapping>,
    param_names: Vec<Option<String>>,
    authorization: Authorization,
    function: BoxedHandlerFn,
}

impl HandlerDefinition {
    pub(crate) fn new(
        name: String,
        kind: HandlerKind,
        priority: i32,
        mappings: Vec<ParameterMapping>,
        param_names: Vec<Option<String>>,
        authorization: Authorization,
        function: BoxedHandlerFn,
    ) -> Self {
        let priority = match kind {
            HandlerKind::Fallback { .. } => FALLBACK_PRIORITY,
            _ => priority,
        };
        Self {
            name,
            kind,
            priority,
            mappings,
            param_names,
            authorization,
            function,
        }
    }

    /// Qualified name of the handler function (`controller::function`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind-specific settings.
    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// Ordering key; lower runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Parameter mappings in declaration order.
    pub fn mappings(&self) -> &[ParameterMapping] {
        &self.mappings
    }

    /// Role requirements.
    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    /// Returns `true` for the fallback handler.
    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, HandlerKind::Fallback { .. })
    }

    /// Returns `true` if this handler applies to `update`.
    pub fn is_applicable(&self, update: &Update) -> bool {
        match &self.kind {
            HandlerKind::Message { pattern, .. } => update
                .as_message()
                .and_then(|message| message.text.as_deref())
                .is_some_and(|text| pattern.is_match(text)),
            HandlerKind::Callback { pattern, .. } => update
                .as_callback()
                .and_then(|callback| callback.data.as_deref())
                .is_some_and(|data| pattern.is_match(data)),
            HandlerKind::Fallback { .. } => true,
        }
    }

    /// Returns `true` if `principal` satisfies the role requirements.
    pub fn is_authorized(&self, principal: Option<&dyn Principal>) -> bool {
        self.authorization.permits(principal)
    }

    /// Runs the handler for the update in `ctx`.
    ///
    /// Resolves the arguments, calls the function, performs the kind's side
    /// effects and sends the reply. Returns the message that was sent.
    pub async fn invoke(&self, ctx: &Arc<UpdateContext>) -> Result<Option<OutgoingMessage>, DispatchError> {
        let args = {
            let captures = self.captures(ctx.update());
            Arguments::resolve(&self.mappings, &self.param_names, ctx, captures.as_ref())
        };

        debug!(handler = %self, "invoking handler");
        let reply = call_guarded(&self.function, args).await?;

        match &self.kind {
            HandlerKind::Message { link_response, .. } | HandlerKind::Fallback { link_response } => {
                send_reply(ctx, reply, *link_response).await
            }
            HandlerKind::Callback { keep_keyboard, .. } => {
                if !keep_keyboard {
                    strip_keyboard(ctx).await?;
                }
                send_reply(ctx, reply, false).await
            }
        }
    }

    fn captures<'u>(&self, update: &'u Update) -> Option<Captures<'u>> {
        match &self.kind {
            HandlerKind::Message { pattern, .. } => update
                .as_message()
                .and_then(|message| message.text.as_deref())
                .and_then(|text| pattern.captures(text)),
            HandlerKind::Callback { pattern, .. } => update
                .as_callback()
                .and_then(|callback| callback.data.as_deref())
                .and_then(|data| pattern.captures(data)),
            HandlerKind::Fallback { .. } => None,
        }
    }
}

async fn strip_keyboard(ctx: &UpdateContext) -> Result<(), DispatchError> {
    let Some(message) = ctx.update().as_callback().and_then(|cb| cb.message.as_ref()) else {
        warn!("callback has no originating message, keyboard left in place");
        return Ok(());
    };
    debug!(
        chat_id = message.chat_id(),
        message_id = message.message_id,
        "removing inline keyboard"
    );
    ctx.sender()
        .strip_keyboard(message.chat_id(), message.message_id)
        .await?;
    Ok(())
}

impl fmt::Display for HandlerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            HandlerKind::Message { pattern, .. } => {
                write!(f, "on_message({}, '{pattern}', {})", self.priority, self.name)
            }
            HandlerKind::Callback { pattern, .. } => {
                write!(f, "on_callback({}, '{pattern}', {})", self.priority, self.name)
            }
            HandlerKind::Fallback { .. } => write!(f, "fallback({})", self.name),
        }
    }
}

impl fmt::Debug for HandlerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("mappings", &self.mappings)
            .field("authorization", &self.authorization)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Reply;
    use crate::test_util::{NullSender, callback_update, message_update};

    fn definition(kind: HandlerKind, priority: i32) -> HandlerDefinition {
        HandlerDefinition::new(
            "test::handler".into(),
            kind,
            priority,
            Vec::new(),
            Vec::new(),
            Authorization::open(),
            into_handler_fn(|_args: Arguments| async { Reply::None }),
        )
    }

    fn message_kind(pattern: &str) -> HandlerKind {
        HandlerKind::Message {
            pattern: RoutePattern::compile(pattern).unwrap(),
            link_response: false,
        }
    }

    #[test]
    fn test_message_applicability() {
        let handler = definition(message_kind("/start"), 0);
        assert!(handler.is_applicable(&message_update(1, "/start")));
        assert!(!handler.is_applicable(&message_update(1, "/start now")));
        assert!(!handler.is_applicable(&callback_update(1, "/start")));
    }

    #[test]
    fn test_callback_applicability() {
        let handler = definition(
            HandlerKind::Callback {
                pattern: RoutePattern::compile("vote:(yes|no)").unwrap(),
                keep_keyboard: false,
            },
            0,
        );
        assert!(handler.is_applicable(&callback_update(1, "vote:yes")));
        assert!(!handler.is_applicable(&callback_update(1, "vote:maybe")));
        assert!(!handler.is_applicable(&message_update(1, "vote:yes")));
    }

    #[test]
    fn test_fallback_applies_to_everything() {
        let handler = definition(HandlerKind::Fallback { link_response: false }, 3);
        assert_eq!(handler.priority(), FALLBACK_PRIORITY);
        assert!(handler.is_fallback());
        assert!(handler.is_applicable(&message_update(1, "anything")));
        assert!(handler.is_applicable(&callback_update(1, "anything")));
    }

    #[test]
    fn test_message_without_text_does_not_apply() {
        let handler = definition(message_kind(".*"), 0);
        let mut update = message_update(1, "");
        if let courier_core::UpdateKind::Message(message) = &mut update.kind {
            message.text = None;
        }
        assert!(!handler.is_applicable(&update));
    }

    #[tokio::test]
    async fn test_invoke_without_reply() {
        let handler = definition(message_kind("hi"), 0);
        let ctx = Arc::new(UpdateContext::new(
            "",
            Arc::new(NullSender),
            Arc::new(message_update(1, "hi")),
            None,
        ));
        assert_eq!(handler.invoke(&ctx).await.unwrap(), None);
    }

    #[test]
    fn test_display() {
        let handler = definition(message_kind("/start"), 5);
        assert_eq!(handler.to_string(), "on_message(5, '/start', test::handler)");
    }
}
