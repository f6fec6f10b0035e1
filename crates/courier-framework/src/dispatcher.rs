//! Update dispatcher for the Courier framework.
//!
//! The [`Dispatcher`] runs one dispatch cycle per update for one bot:
//!
//! 1. Resolve the sender's principal and build the [`UpdateContext`]
//! 2. Ask `on_update` whether to process the update at all
//! 3. Collect the applicable handlers and order them by priority
//! 4. Run the first authorized one after `on_authorized_access` agreed
//! 5. Otherwise report unauthorized access, or fall back, or report that
//!    no handler exists
//! 6. Report the outcome to `on_update_completed`
//!
//! ```text
//!                 on_update ──false──▶ SKIPPED
//!                     │
//!          applicable handlers (by priority)
//!          ┌──────────┴───────────┬─────────────────┐
//!   authorized one          only unauthorized      none
//!          │                      │                 │
//!  on_authorized_access    HANDLER_UNAUTHORIZED   fallback? ── no ──▶ NO_HANDLER
//!    │          │                                   │
//!  false      invoke ──▶ HANDLER_COMPLETED     authorized? ── no ──▶ FALLBACK_UNAUTHORIZED
//!    │          └──────▶ HANDLER_FAILED             │
//!  HANDLER_SKIPPED                         on_authorized_access ── false ──▶ FALLBACK_SKIPPED
//!                                                   │
//!                                                invoke ──▶ HANDLER_COMPLETED / HANDLER_FAILED
//! ```
//!
//! Dispatch never fails: every error, including panics, ends in an outcome
//! and a log entry. A panicking hook counts as a hook error.
//!
//! ```rust,ignore
//! use courier_framework::{ControllerBinder, Dispatcher};
//!
//! let bindings = binder.bind(|bot| config.credentials(bot))?;
//! let dispatcher = Dispatcher::builder(bindings.remove("").unwrap(), sender)
//!     .hooks(AuditHooks)
//!     .build();
//!
//! let outcome = dispatcher.dispatch(update).await;
//! ```

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use courier_core::{BoxedSender, Update};

use crate::binder::BotBinding;
use crate::context::UpdateContext;
use crate::error::{BoxError, DispatchError, ErrorChain};
use crate::handler::{HandlerDefinition, panic_message};
use crate::hooks::{BotConfiguration, DefaultConfiguration, DispatchResult, NoHooks, UpdateHooks};
use crate::outcome::ProcessingOutcome;

const ON_UPDATE: &str = "on_update";
const ON_AUTHORIZED_ACCESS: &str = "on_authorized_access";
const ON_UNAUTHORIZED_ACCESS: &str = "on_unauthorized_access";
const ON_NO_HANDLER: &str = "on_no_handler";
const ON_UPDATE_COMPLETED: &str = "on_update_completed";

struct DispatcherInner {
    binding: BotBinding,
    sender: BoxedSender,
    configuration: Arc<dyn BotConfiguration>,
    hooks: Arc<dyn UpdateHooks>,
}

/// The dispatch engine of one bot.
///
/// Cheap to clone; clones share the binding, sender and hooks.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    binding: BotBinding,
    sender: BoxedSender,
    configuration: Arc<dyn BotConfiguration>,
    hooks: Arc<dyn UpdateHooks>,
}

impl DispatcherBuilder {
    /// Sets the principal and context configuration.
    pub fn configuration(mut self, configuration: impl BotConfiguration + 'static) -> Self {
        self.configuration = Arc::new(configuration);
        self
    }

    /// Sets a shared configuration.
    pub fn shared_configuration(mut self, configuration: Arc<dyn BotConfiguration>) -> Self {
        self.configuration = configuration;
        self
    }

    /// Sets the hooks.
    pub fn hooks(mut self, hooks: impl UpdateHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Sets shared hooks.
    pub fn shared_hooks(mut self, hooks: Arc<dyn UpdateHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                binding: self.binding,
                sender: self.sender,
                configuration: self.configuration,
                hooks: self.hooks,
            }),
        }
    }
}

impl Dispatcher {
    /// Creates a dispatcher with the default configuration and no hooks.
    pub fn new(binding: BotBinding, sender: BoxedSender) -> Self {
        Self::builder(binding, sender).build()
    }

    /// Starts building a dispatcher.
    pub fn builder(binding: BotBinding, sender: BoxedSender) -> DispatcherBuilder {
        DispatcherBuilder {
            binding,
            sender,
            configuration: Arc::new(DefaultConfiguration),
            hooks: Arc::new(NoHooks),
        }
    }

    /// The binding this dispatcher serves.
    pub fn binding(&self) -> &BotBinding {
        &self.inner.binding
    }

    /// The sender replies go through.
    pub fn sender(&self) -> &BoxedSender {
        &self.inner.sender
    }

    /// Runs one dispatch cycle for `update`.
    pub async fn dispatch(&self, update: Update) -> ProcessingOutcome {
        let cycle_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            bot = %self.inner.binding.name(),
            update_id = update.update_id,
            kind = update.kind_name(),
            cycle = %cycle_id,
        );

        async move {
            match AssertUnwindSafe(self.run_cycle(update, cycle_id)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    error!(panic = %panic_message(&*panic), "Update processing panicked");
                    ProcessingOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_cycle(&self, update: Update, cycle_id: Uuid) -> ProcessingOutcome {
        match serde_json::to_string(&update) {
            Ok(json) => info!(update = %json, "Processing update"),
            Err(_) => info!(update = ?update, "Processing update"),
        }

        let ctx = match self.build_context(update, cycle_id).await {
            Ok(ctx) => ctx,
            Err(err) => {
                error!(error = %err.chain(), "Failed to build update context");
                return ProcessingOutcome::Failed;
            }
        };

        let (outcome, result) = self.select_and_run(&ctx).await;
        match &result {
            Err(err) if !err.is_rejection() => error!(%outcome, error = %err.chain(), "Update processing failed"),
            _ => info!(%outcome, "Update processed"),
        }

        let completed = self.inner.hooks.on_update_completed(&ctx, outcome, &result);
        if let Err(panic) = AssertUnwindSafe(completed).catch_unwind().await {
            error!(hook = ON_UPDATE_COMPLETED, panic = %panic_message(&*panic), "Hook panicked");
        }
        outcome
    }

    async fn build_context(&self, update: Update, cycle_id: Uuid) -> Result<Arc<UpdateContext>, DispatchError> {
        let principal = match update.sender_id() {
            Some(user_id) => guarded(self.inner.configuration.resolve_principal(user_id))
                .await
                .map_err(DispatchError::Preparation)?,
            None => None,
        };
        debug!(principal = ?principal, "Resolved principal");

        let ctx = Arc::new(UpdateContext::with_cycle_id(
            self.inner.binding.name(),
            self.inner.sender.clone(),
            Arc::new(update),
            principal,
            cycle_id,
        ));
        self.inner
            .configuration
            .prepare_context(&ctx)
            .map_err(DispatchError::Preparation)?;
        Ok(ctx)
    }

    async fn select_and_run(&self, ctx: &Arc<UpdateContext>) -> (ProcessingOutcome, DispatchResult) {
        let hooks = &self.inner.hooks;

        if let Some(rejection) = filter(ON_UPDATE, guarded(hooks.on_update(ctx)).await) {
            info!("Skipping update due to on_update result");
            return (ProcessingOutcome::Skipped, Err(rejection));
        }

        let update = ctx.update();
        let principal = ctx.principal().map(|p| &**p);

        let mut candidates: Vec<&HandlerDefinition> = self
            .inner
            .binding
            .handlers()
            .iter()
            .filter(|h| h.is_applicable(update))
            .collect();
        // Stable: equal priorities keep discovery order.
        candidates.sort_by_key(|h| h.priority());
        debug!("Found {} applicable handler(s)", candidates.len());

        let authorized: Vec<&HandlerDefinition> = candidates
            .iter()
            .copied()
            .filter(|h| h.is_authorized(principal))
            .collect();

        if let Some(&handler) = authorized.first() {
            if let Some(&next) = authorized.get(1).filter(|next| next.priority() == handler.priority()) {
                warn!(
                    selected = %handler,
                    other = %next,
                    "Ambiguous handlers with the same priority, using the first one"
                );
            }

            if let Some(rejection) = filter(ON_AUTHORIZED_ACCESS, guarded(hooks.on_authorized_access(ctx)).await) {
                info!(handler = %handler, "Skipping handler due to on_authorized_access result");
                return (ProcessingOutcome::HandlerSkipped, Err(rejection));
            }
            return invoke(handler, ctx).await;
        }

        if !candidates.is_empty() {
            let names: Vec<String> = candidates.iter().map(|h| h.to_string()).collect();
            warn!(
                handlers = ?names,
                "Applicable handlers found but the principal is not authorized for any of them"
            );
            let result = notify(ON_UNAUTHORIZED_ACCESS, guarded(hooks.on_unauthorized_access(ctx)).await);
            return (ProcessingOutcome::HandlerUnauthorized, result);
        }

        match self.inner.binding.fallback() {
            Some(fallback) if fallback.is_authorized(principal) => {
                if let Some(rejection) = filter(ON_AUTHORIZED_ACCESS, guarded(hooks.on_authorized_access(ctx)).await) {
                    info!("Skipping fallback due to on_authorized_access result");
                    return (ProcessingOutcome::FallbackSkipped, Err(rejection));
                }
                invoke(fallback, ctx).await
            }
            Some(fallback) => {
                warn!(fallback = %fallback, "Principal is not authorized for the fallback handler");
                let result = notify(ON_UNAUTHORIZED_ACCESS, guarded(hooks.on_unauthorized_access(ctx)).await);
                (ProcessingOutcome::FallbackUnauthorized, result)
            }
            None => {
                info!("No handler found");
                let result = notify(ON_NO_HANDLER, guarded(hooks.on_no_handler(ctx)).await);
                (ProcessingOutcome::NoHandler, result)
            }
        }
    }
}

async fn invoke(handler: &HandlerDefinition, ctx: &Arc<UpdateContext>) -> (ProcessingOutcome, DispatchResult) {
    info!(handler = %handler, "Selected handler");
    match handler.invoke(ctx).await {
        Ok(sent) => (ProcessingOutcome::HandlerCompleted, Ok(sent)),
        Err(err) => (ProcessingOutcome::HandlerFailed, Err(err)),
    }
}

/// Awaits a hook, turning a panic into an error.
async fn guarded<T>(call: impl Future<Output = Result<T, BoxError>>) -> Result<T, BoxError> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(format!("panicked: {}", panic_message(&*panic)).into()),
    }
}

fn filter(hook: &'static str, result: Result<bool, BoxError>) -> Option<DispatchError> {
    match result {
        Ok(true) => None,
        Ok(false) => Some(DispatchError::Rejected { hook }),
        Err(source) => {
            info!(hook, error = %ErrorChain(&*source), "Hook failed, treating as rejection");
            Some(DispatchError::Hook { hook, source })
        }
    }
}

fn notify(hook: &'static str, result: Result<(), BoxError>) -> DispatchResult {
    result.map(|()| None).map_err(|source| {
        warn!(hook, error = %ErrorChain(&*source), "Hook failed");
        DispatchError::Hook { hook, source }
    })
}

impl tower::Service<Update> for Dispatcher {
    type Response = ProcessingOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, update: Update) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(update).await) })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bot", &self.inner.binding.name())
            .field("handler_count", &self.inner.binding.handlers().len())
            .field("has_fallback", &self.inner.binding.fallback().is_some())
            .finish()
    }
}
