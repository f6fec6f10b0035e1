//! Controller registration.
//!
//! A [`Controller`] groups handler functions for one bot. Each
//! [`HandlerFunction`] declares its parameters and one or more routes:
//!
//! ```rust,ignore
//! use courier_framework::prelude::*;
//!
//! let greeter = Controller::new("greeter")
//!     .bot("support")
//!     .function(
//!         HandlerFunction::new("greet", |args: Arguments| async move {
//!             let name = args.required_text(0)?.to_owned();
//!             Ok::<_, BoxError>(format!("Hello, {name}!"))
//!         })
//!         .param(Param::string("name"))
//!         .on_message(OnMessage::new(r"/greet (?<name>\w+)").link_response(true)),
//!     )
//!     .function(
//!         HandlerFunction::new("unknown", |_args: Arguments| async {})
//!             .fallback(FallbackMapping::new()),
//!     );
//! ```
//!
//! Role requirements can be put on the controller, the function, or both.
//! A controller can extend another one to inherit its functions.

use std::collections::HashSet;
use std::future::Future;

use courier_core::{DEFAULT_BOT, RoleSet};

use crate::handler::{BoxedHandlerFn, into_handler_fn};
use crate::param::{Arguments, Param, RouteKind};
use crate::response::IntoReply;

/// A text message route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMessage {
    /// Pattern the whole message text must match.
    pub pattern: String,
    /// Reply as a quote of the incoming message.
    pub link_response: bool,
    /// Ordering key; lower runs first.
    pub priority: i32,
}

impl OnMessage {
    /// A route for `pattern` with priority 0.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            link_response: false,
            priority: 0,
        }
    }

    /// Sets whether replies quote the incoming message.
    pub fn link_response(mut self, link: bool) -> Self {
        self.link_response = link;
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A callback query route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnCallback {
    /// Pattern the whole callback data must match.
    pub pattern: String,
    /// Leave the inline keyboard on the originating message.
    pub keep_keyboard: bool,
    /// Ordering key; lower runs first.
    pub priority: i32,
}

impl OnCallback {
    /// A route for `pattern` with priority 0.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            keep_keyboard: false,
            priority: 0,
        }
    }

    /// Sets whether the keyboard stays after handling.
    pub fn keep_keyboard(mut self, keep: bool) -> Self {
        self.keep_keyboard = keep;
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// The catch-all route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackMapping {
    /// Reply as a quote of the incoming message.
    pub link_response: bool,
}

impl FallbackMapping {
    /// A fallback route.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether replies quote the incoming message.
    pub fn link_response(mut self, link: bool) -> Self {
        self.link_response = link;
        self
    }
}

/// A route declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Message(OnMessage),
    Callback(OnCallback),
    Fallback(FallbackMapping),
}

impl Route {
    /// The route kind.
    pub fn kind(&self) -> RouteKind {
        match self {
            Self::Message(_) => RouteKind::Message,
            Self::Callback(_) => RouteKind::Callback,
            Self::Fallback(_) => RouteKind::Fallback,
        }
    }
}

/// A handler function with its parameters, routes and role requirement.
#[derive(Clone)]
pub struct HandlerFunction {
    name: String,
    function: BoxedHandlerFn,
    params: Vec<Param>,
    authorized: Option<RoleSet>,
    routes: Vec<Route>,
}

impl HandlerFunction {
    /// Wraps an async function taking [`Arguments`].
    pub fn new<F, Fut, R>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        Self::from_boxed(name, into_handler_fn(f))
    }

    /// Wraps an already erased function.
    pub fn from_boxed(name: impl Into<String>, function: BoxedHandlerFn) -> Self {
        Self {
            name: name.into(),
            function,
            params: Vec::new(),
            authorized: None,
            routes: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Appends several parameters.
    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Requires every role of `roles`. An empty set still requires a principal.
    pub fn authorized<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized = Some(roles.into_iter().collect());
        self
    }

    /// Adds a message route.
    pub fn on_message(mut self, route: OnMessage) -> Self {
        self.routes.push(Route::Message(route));
        self
    }

    /// Adds a callback route.
    pub fn on_callback(mut self, route: OnCallback) -> Self {
        self.routes.push(Route::Callback(route));
        self
    }

    /// Adds the fallback route.
    pub fn fallback(mut self, route: FallbackMapping) -> Self {
        self.routes.push(Route::Fallback(route));
        self
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The erased function.
    pub fn function(&self) -> &BoxedHandlerFn {
        &self.function
    }

    /// Declared parameters.
    pub fn parameters(&self) -> &[Param] {
        &self.params
    }

    /// Function-level role requirement.
    pub fn required_roles(&self) -> Option<&RoleSet> {
        self.authorized.as_ref()
    }

    /// Declared routes.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl std::fmt::Debug for HandlerFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("authorized", &self.authorized)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// A named group of handler functions bound to one bot.
#[derive(Debug, Clone)]
pub struct Controller {
    name: String,
    bot: String,
    authorized: Option<RoleSet>,
    functions: Vec<HandlerFunction>,
    inherited_authorized: Option<RoleSet>,
    inherited: Vec<HandlerFunction>,
}

impl Controller {
    /// A controller for the default bot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bot: DEFAULT_BOT.to_owned(),
            authorized: None,
            functions: Vec::new(),
            inherited_authorized: None,
            inherited: Vec::new(),
        }
    }

    /// Binds the controller to the bot named `bot`.
    pub fn bot(mut self, bot: impl Into<String>) -> Self {
        self.bot = bot.into();
        self
    }

    /// Requires every role of `roles` for all handlers of this controller.
    pub fn authorized<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized = Some(roles.into_iter().collect());
        self
    }

    /// Adds a handler function.
    pub fn function(mut self, function: HandlerFunction) -> Self {
        self.functions.push(function);
        self
    }

    /// Inherits the functions and role requirement of `parent`.
    ///
    /// Functions declared on `self` override inherited ones of the same name.
    /// The role requirement of `self` wins if both declare one.
    pub fn extends(mut self, parent: &Controller) -> Self {
        self.inherited_authorized = parent.class_authorization().cloned();
        self.inherited = parent.functions().cloned().collect();
        self
    }

    /// The controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bot this controller is bound to.
    pub fn bot_name(&self) -> &str {
        &self.bot
    }

    /// The effective controller-level role requirement.
    pub fn class_authorization(&self) -> Option<&RoleSet> {
        self.authorized.as_ref().or(self.inherited_authorized.as_ref())
    }

    /// The effective handler functions: own ones first, then inherited ones
    /// that are not overridden.
    pub fn functions(&self) -> impl Iterator<Item = &HandlerFunction> {
        let own: HashSet<&str> = self.functions.iter().map(|f| f.name()).collect();
        self.functions.iter().chain(
            self.inherited
                .iter()
                .filter(move |f| !own.contains(f.name())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> HandlerFunction {
        HandlerFunction::new(name, |_args: Arguments| async {})
    }

    #[test]
    fn test_defaults() {
        let controller = Controller::new("c");
        assert_eq!(controller.bot_name(), DEFAULT_BOT);
        assert!(controller.class_authorization().is_none());
        assert_eq!(OnMessage::new("x").priority, 0);
        assert!(!OnCallback::new("x").keep_keyboard);
        assert!(!FallbackMapping::new().link_response);
    }

    #[test]
    fn test_function_routes() {
        let function = noop("f")
            .on_message(OnMessage::new("/a").priority(2))
            .on_callback(OnCallback::new("a").keep_keyboard(true))
            .authorized(["admin"]);

        let kinds: Vec<_> = function.routes().iter().map(Route::kind).collect();
        assert_eq!(kinds, vec![RouteKind::Message, RouteKind::Callback]);
        assert!(function.required_roles().is_some_and(|r| r.contains("admin")));
    }

    #[test]
    fn test_extends_inherits_and_overrides() {
        let parent = Controller::new("base")
            .authorized(["staff"])
            .function(noop("help"))
            .function(noop("ping"));
        let child = Controller::new("child")
            .function(noop("ping"))
            .function(noop("status"))
            .extends(&parent);

        let names: Vec<_> = child.functions().map(HandlerFunction::name).collect();
        assert_eq!(names, vec!["ping", "status", "help"]);
        assert!(child.class_authorization().is_some_and(|r| r.contains("staff")));

        let strict = Controller::new("strict").authorized(["root"]).extends(&parent);
        assert!(strict.class_authorization().is_some_and(|r| r.contains("root")));
        assert!(!strict.class_authorization().is_some_and(|r| r.contains("staff")));
    }
}
