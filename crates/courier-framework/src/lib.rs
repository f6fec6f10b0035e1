//! # Courier Framework
//!
//! The update dispatch core of Courier.
//!
//! This layer provides:
//! - Controller and handler function registration with role requirements
//! - Declarative parameter mapping from updates to handler arguments
//! - Binding of controllers to bots with startup validation
//! - The per-update dispatch state machine with filter and observation hooks
//! - Reply resolution from handler return values
//!
//! It is transport-agnostic: replies and keyboard removal go through the
//! [`Sender`](courier_core::Sender) trait.

pub mod auth;
pub mod binder;
pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod outcome;
pub mod param;
pub mod response;

#[cfg(test)]
mod test_util;

pub use auth::Authorization;
pub use binder::{BotBinding, ControllerBinder};
pub use context::UpdateContext;
pub use controller::{Controller, FallbackMapping, HandlerFunction, OnCallback, OnMessage, Route};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{
    ArgumentError, BoxError, ConfigError, ConfigResult, DispatchError, ErrorChain, MappingError,
};
pub use handler::{
    BoxedHandlerFn, FALLBACK_PRIORITY, HandlerDefinition, HandlerFn, HandlerKind, RoutePattern,
    into_handler_fn,
};
pub use hooks::{BotConfiguration, DefaultConfiguration, DispatchResult, NoHooks, UpdateHooks};
pub use outcome::ProcessingOutcome;
pub use param::{
    Argument, Arguments, Param, ParamAnnotation, ParamType, ParameterMapping, PrincipalType,
    RouteKind, map_parameter,
};
pub use response::{IntoReply, Reply};

/// Prelude for writing controllers and hooks.
pub mod prelude {
    pub use crate::{
        Arguments, BotConfiguration, BoxError, Controller, FallbackMapping, HandlerFunction,
        OnCallback, OnMessage, Param, ParamType, PrincipalType, ProcessingOutcome, Reply,
        UpdateContext, UpdateHooks,
    };
    pub use async_trait::async_trait;
}
