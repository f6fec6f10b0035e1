//! Per-update context.
//!
//! An [`UpdateContext`] is created for every update before dispatch and
//! dropped when the cycle ends. It gives hooks and handlers access to:
//!
//! - The bot identity the update arrived on and its [`Sender`](courier_core::Sender)
//! - The raw [`Update`]
//! - The resolved principal, if the update has a sender
//! - A type-keyed state map for passing data between hooks and the handler
//!
//! ```rust,ignore
//! async fn on_update(&self, ctx: &UpdateContext) -> Result<bool, BoxError> {
//!     ctx.set_state(RequestStart(Instant::now()));
//!     Ok(true)
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use courier_core::{BoxedPrincipal, BoxedSender, Principal, Update, downcast_principal};

/// Context of one update dispatch cycle.
pub struct UpdateContext {
    bot_name: String,
    sender: BoxedSender,
    update: Arc<Update>,
    principal: Option<BoxedPrincipal>,
    cycle_id: Uuid,
    state: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl UpdateContext {
    /// Creates a context with a fresh cycle id.
    pub fn new(
        bot_name: impl Into<String>,
        sender: BoxedSender,
        update: Arc<Update>,
        principal: Option<BoxedPrincipal>,
    ) -> Self {
        Self::with_cycle_id(bot_name, sender, update, principal, Uuid::new_v4())
    }

    pub(crate) fn with_cycle_id(
        bot_name: impl Into<String>,
        sender: BoxedSender,
        update: Arc<Update>,
        principal: Option<BoxedPrincipal>,
        cycle_id: Uuid,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            sender,
            update,
            principal,
            cycle_id,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Name of the bot the update arrived on.
    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// The sender of the bot.
    pub fn sender(&self) -> &BoxedSender {
        &self.sender
    }

    /// The update being dispatched.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// The update as a shared pointer.
    pub fn update_arc(&self) -> Arc<Update> {
        self.update.clone()
    }

    /// The resolved principal, if any.
    pub fn principal(&self) -> Option<&BoxedPrincipal> {
        self.principal.as_ref()
    }

    /// The resolved principal viewed as its concrete type.
    pub fn principal_as<P: Principal>(&self) -> Option<&P> {
        self.principal
            .as_ref()
            .and_then(|principal| downcast_principal::<P>(&**principal))
    }

    /// Correlation id of this dispatch cycle, as shown in logs.
    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    /// Stores a value in the state map. One value per type; later calls overwrite.
    pub fn set_state<T: Send + Sync + 'static>(&self, value: T) {
        self.state.lock().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a cloned value from the state map.
    pub fn get_state<T: Clone + 'static>(&self) -> Option<T> {
        self.state
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns `true` if a value of type `T` is stored.
    pub fn has_state<T: 'static>(&self) -> bool {
        self.state.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a value from the state map.
    pub fn take_state<T: 'static>(&self) -> Option<T> {
        self.state
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for UpdateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("bot_name", &self.bot_name)
            .field("update_id", &self.update.update_id)
            .field("principal", &self.principal)
            .field("cycle_id", &self.cycle_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{NullSender, message_update};
    use courier_core::SimplePrincipal;

    #[test]
    fn test_state_roundtrip() {
        let ctx = UpdateContext::new(
            "",
            Arc::new(NullSender),
            Arc::new(message_update(1, "hi")),
            None,
        );

        ctx.set_state(42u32);
        ctx.set_state(String::from("note"));
        assert!(ctx.has_state::<u32>());
        assert_eq!(ctx.get_state::<u32>(), Some(42));

        ctx.set_state(7u32);
        assert_eq!(ctx.take_state::<u32>(), Some(7));
        assert!(!ctx.has_state::<u32>());
        assert_eq!(ctx.get_state::<String>().as_deref(), Some("note"));
    }

    #[test]
    fn test_principal_downcast() {
        let ctx = UpdateContext::new(
            "support",
            Arc::new(NullSender),
            Arc::new(message_update(1, "hi")),
            Some(Arc::new(SimplePrincipal::new(5, ["admin"]))),
        );

        assert_eq!(ctx.bot_name(), "support");
        assert_eq!(ctx.principal_as::<SimplePrincipal>().map(|p| p.user_id()), Some(5));
        assert!(ctx.principal_as::<courier_core::AnonymousPrincipal>().is_none());
    }
}
