//! Per-bot extension points.
//!
//! Two traits customize how a bot processes updates:
//!
//! - [`BotConfiguration`] resolves the principal of an update's sender and
//!   prepares the [`UpdateContext`] before dispatch.
//! - [`UpdateHooks`] observes and filters the dispatch cycle.
//!
//! Every method has a default, so implementations only override what they
//! need. Filter hooks return `Ok(false)` to stop processing; an `Err` or a
//! panic is treated the same way and logged.
//!
//! ```rust,ignore
//! struct AuditHooks;
//!
//! #[async_trait]
//! impl UpdateHooks for AuditHooks {
//!     async fn on_unauthorized_access(&self, ctx: &UpdateContext) -> Result<(), BoxError> {
//!         warn!(user = ?ctx.update().sender_id(), "access denied");
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{AnonymousPrincipal, BoxedPrincipal, OutgoingMessage, UserId};

use crate::context::UpdateContext;
use crate::error::{BoxError, DispatchError};
use crate::outcome::ProcessingOutcome;

/// The result of a dispatch cycle: the message sent, if any, or the reason
/// the cycle did not complete normally.
pub type DispatchResult = Result<Option<OutgoingMessage>, DispatchError>;

/// Principal resolution and context preparation for one bot.
#[async_trait]
pub trait BotConfiguration: Send + Sync {
    /// Resolves the principal of the user with id `user_id`.
    ///
    /// Defaults to an [`AnonymousPrincipal`] without roles.
    async fn resolve_principal(&self, user_id: UserId) -> Result<Option<BoxedPrincipal>, BoxError> {
        Ok(Some(Arc::new(AnonymousPrincipal::new(user_id))))
    }

    /// Prepares the context before dispatch, e.g. by seeding its state map.
    fn prepare_context(&self, _ctx: &UpdateContext) -> Result<(), BoxError> {
        Ok(())
    }
}

/// The default [`BotConfiguration`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfiguration;

impl BotConfiguration for DefaultConfiguration {}

/// Observation and filter points of the dispatch cycle.
#[async_trait]
pub trait UpdateHooks: Send + Sync {
    /// Called first for every update. `Ok(false)` skips the update.
    async fn on_update(&self, _ctx: &UpdateContext) -> Result<bool, BoxError> {
        Ok(true)
    }

    /// Called before an authorized handler runs. `Ok(false)` skips it.
    async fn on_authorized_access(&self, _ctx: &UpdateContext) -> Result<bool, BoxError> {
        Ok(true)
    }

    /// Called when handlers matched but none was authorized, or when the
    /// fallback is not authorized.
    async fn on_unauthorized_access(&self, _ctx: &UpdateContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called when nothing matched and no fallback exists.
    async fn on_no_handler(&self, _ctx: &UpdateContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called last, with the outcome and the result of the cycle.
    async fn on_update_completed(
        &self,
        _ctx: &UpdateContext,
        _outcome: ProcessingOutcome,
        _result: &DispatchResult,
    ) {
    }
}

/// Hooks that accept everything and observe nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl UpdateHooks for NoHooks {}
