//! Binding controllers to bots.
//!
//! At startup the [`ControllerBinder`] turns registered controllers into one
//! [`BotBinding`] per bot name:
//!
//! 1. Controllers are grouped by the bot they name.
//! 2. Every route of every function becomes a [`HandlerDefinition`]; route
//!    patterns are compiled and parameter mappings computed up front.
//! 3. At most one fallback handler may exist per bot, and it must not return
//!    a value.
//! 4. Credentials are looked up for each bot name.
//!
//! Any violation is a [`ConfigError`] and aborts startup.

use std::collections::BTreeMap;

use tracing::{debug, info};

use courier_core::BotCredentials;

use crate::auth::Authorization;
use crate::controller::{Controller, HandlerFunction, Route};
use crate::error::{ConfigError, ConfigResult};
use crate::handler::{HandlerDefinition, HandlerKind, RoutePattern};
use crate::param::map_parameter;

/// The handlers of one bot identity.
#[derive(Debug, Clone)]
pub struct BotBinding {
    name: String,
    credentials: BotCredentials,
    handlers: Vec<HandlerDefinition>,
    fallback: Option<HandlerDefinition>,
}

impl BotBinding {
    /// The bot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bot's credentials.
    pub fn credentials(&self) -> &BotCredentials {
        &self.credentials
    }

    /// Non-fallback handlers in discovery order.
    pub fn handlers(&self) -> &[HandlerDefinition] {
        &self.handlers
    }

    /// The fallback handler, if one is registered.
    pub fn fallback(&self) -> Option<&HandlerDefinition> {
        self.fallback.as_ref()
    }
}

/// Collects controllers and binds them to bots.
#[derive(Debug, Clone, Default)]
pub struct ControllerBinder {
    controllers: Vec<Controller>,
}

impl ControllerBinder {
    /// Creates an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a controller.
    pub fn add(&mut self, controller: Controller) {
        self.controllers.push(controller);
    }

    /// Adds a controller (builder pattern).
    pub fn with(mut self, controller: Controller) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Registered controllers.
    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    /// Distinct bot names referenced by the controllers, sorted.
    pub fn bot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.controllers.iter().map(|c| c.bot_name().to_owned()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Binds every referenced bot, looking up credentials with `credentials`.
    pub fn bind<F>(&self, credentials: F) -> ConfigResult<BTreeMap<String, BotBinding>>
    where
        F: Fn(&str) -> Option<BotCredentials>,
    {
        info!("Loaded {} controller(s)", self.controllers.len());

        let mut bindings = BTreeMap::new();
        for bot in self.bot_names() {
            let creds = credentials(&bot).ok_or_else(|| ConfigError::MissingCredentials { bot: bot.clone() })?;
            let binding = self.bind_bot(&bot, creds)?;
            bindings.insert(bot, binding);
        }
        Ok(bindings)
    }

    /// Binds the controllers of the bot named `bot`.
    pub fn bind_bot(&self, bot: &str, credentials: BotCredentials) -> ConfigResult<BotBinding> {
        let mut handlers = Vec::new();
        let mut fallback: Option<HandlerDefinition> = None;

        for controller in self.controllers.iter().filter(|c| c.bot_name() == bot) {
            debug!(bot, controller = controller.name(), "binding controller");
            for function in controller.functions() {
                for definition in build_definitions(controller, function)? {
                    if !definition.is_fallback() {
                        handlers.push(definition);
                        continue;
                    }
                    if let Some(existing) = &fallback {
                        return Err(ConfigError::DuplicateFallback {
                            bot: bot.to_owned(),
                            first: existing.name().to_owned(),
                            second: definition.name().to_owned(),
                        });
                    }
                    fallback = Some(definition);
                }
            }
        }

        info!(
            bot,
            fallback = fallback.is_some(),
            "Loaded {} handler(s)",
            handlers.len()
        );
        for handler in &handlers {
            debug!(bot, "  {handler}");
        }

        Ok(BotBinding {
            name: bot.to_owned(),
            credentials,
            handlers,
            fallback,
        })
    }
}

fn build_definitions(controller: &Controller, function: &HandlerFunction) -> ConfigResult<Vec<HandlerDefinition>> {
    let name = format!("{}::{}", controller.name(), function.name());
    let authorization = Authorization::new(
        controller.class_authorization().cloned(),
        function.required_roles().cloned(),
    );
    let param_names: Vec<Option<String>> = function
        .parameters()
        .iter()
        .map(|p| p.name().map(str::to_owned))
        .collect();

    function
        .routes()
        .iter()
        .map(|route| {
            let mappings = function
                .parameters()
                .iter()
                .enumerate()
                .map(|(index, param)| {
                    map_parameter(param, route.kind()).map_err(|source| ConfigError::UnmappableParameter {
                        handler: name.clone(),
                        index,
                        param: param.to_string(),
                        source,
                    })
                })
                .collect::<ConfigResult<Vec<_>>>()?;

            let (kind, priority) = match route {
                Route::Message(route) => (
                    HandlerKind::Message {
                        pattern: compile(&name, &route.pattern)?,
                        link_response: route.link_response,
                    },
                    route.priority,
                ),
                Route::Callback(route) => (
                    HandlerKind::Callback {
                        pattern: compile(&name, &route.pattern)?,
                        keep_keyboard: route.keep_keyboard,
                    },
                    route.priority,
                ),
                Route::Fallback(route) => {
                    if function.function().returns_value() {
                        return Err(ConfigError::FallbackReturnsValue { handler: name.clone() });
                    }
                    (
                        HandlerKind::Fallback {
                            link_response: route.link_response,
                        },
                        0,
                    )
                }
            };

            Ok(HandlerDefinition::new(
                name.clone(),
                kind,
                priority,
                mappings,
                param_names.clone(),
                authorization.clone(),
                function.function().clone(),
            ))
        })
        .collect()
}

fn compile(handler: &str, pattern: &str) -> ConfigResult<RoutePattern> {
    RoutePattern::compile(pattern).map_err(|source| ConfigError::InvalidPattern {
        handler: handler.to_owned(),
        pattern: pattern.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{FallbackMapping, OnCallback, OnMessage};
    use crate::param::{Arguments, Param, ParamType, ParameterMapping};
    use courier_core::{DEFAULT_BOT, SimplePrincipal};

    fn creds(_bot: &str) -> Option<BotCredentials> {
        Some(BotCredentials::new("token", "bot"))
    }

    fn noop(name: &str) -> HandlerFunction {
        HandlerFunction::new(name, |_args: Arguments| async {})
    }

    #[test]
    fn test_bind_groups_by_bot() {
        let binder = ControllerBinder::new()
            .with(Controller::new("a").function(noop("x").on_message(OnMessage::new("x"))))
            .with(
                Controller::new("b")
                    .bot("support")
                    .function(noop("y").on_message(OnMessage::new("y")).on_callback(OnCallback::new("y")))
                    .function(noop("z").fallback(FallbackMapping::new())),
            );

        assert_eq!(binder.bot_names(), vec![DEFAULT_BOT.to_owned(), "support".to_owned()]);

        let bindings = binder.bind(creds).unwrap();
        assert_eq!(bindings[DEFAULT_BOT].handlers().len(), 1);
        assert!(bindings[DEFAULT_BOT].fallback().is_none());

        let support = &bindings["support"];
        assert_eq!(support.handlers().len(), 2);
        assert_eq!(support.fallback().map(|f| f.name()), Some("b::z"));
    }

    #[test]
    fn test_missing_credentials() {
        let binder = ControllerBinder::new().with(Controller::new("a").bot("ghost"));
        let err = binder.bind(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials { bot } if bot == "ghost"));
    }

    #[test]
    fn test_duplicate_fallback_rejected() {
        let binder = ControllerBinder::new()
            .with(Controller::new("a").function(noop("f1").fallback(FallbackMapping::new())))
            .with(Controller::new("b").function(noop("f2").fallback(FallbackMapping::new())));
        let err = binder.bind(creds).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFallback { .. }));
    }

    #[test]
    fn test_fallbacks_on_different_bots_are_fine() {
        let binder = ControllerBinder::new()
            .with(Controller::new("a").function(noop("f1").fallback(FallbackMapping::new())))
            .with(
                Controller::new("b")
                    .bot("other")
                    .function(noop("f2").fallback(FallbackMapping::new())),
            );
        assert!(binder.bind(creds).is_ok());
    }

    #[test]
    fn test_fallback_returning_value_rejected() {
        let binder = ControllerBinder::new().with(
            Controller::new("a").function(
                HandlerFunction::new("f", |_args: Arguments| async { "hi" }).fallback(FallbackMapping::new()),
            ),
        );
        let err = binder.bind(creds).unwrap_err();
        assert!(matches!(err, ConfigError::FallbackReturnsValue { handler } if handler == "a::f"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let binder = ControllerBinder::new()
            .with(Controller::new("a").function(noop("f").on_message(OnMessage::new("(oops"))));
        assert!(matches!(
            binder.bind(creds).unwrap_err(),
            ConfigError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_mapping_depends_on_route() {
        let function = noop("f")
            .param(Param::raw_message("msg"))
            .on_message(OnMessage::new("x"))
            .on_callback(OnCallback::new("x"));
        let binder = ControllerBinder::new().with(Controller::new("a").function(function));

        let err = binder.bind(creds).unwrap_err();
        match err {
            ConfigError::UnmappableParameter { handler, index, .. } => {
                assert_eq!(handler, "a::f");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_definitions_carry_mappings_and_auth() {
        let function = noop("f")
            .param(Param::string("name"))
            .param(Param::principal::<SimplePrincipal>("me"))
            .param(Param::unnamed(ParamType::optional_string()).group_index(1))
            .authorized(["ops"])
            .on_message(OnMessage::new(r"(?<name>\w+)").priority(-3));
        let binder = ControllerBinder::new().with(Controller::new("a").authorized(["staff"]).function(function));

        let bindings = binder.bind(creds).unwrap();
        let handler = &bindings[DEFAULT_BOT].handlers()[0];
        assert_eq!(handler.priority(), -3);
        assert_eq!(handler.mappings()[0], ParameterMapping::NamedGroup("name".into()));
        assert_eq!(handler.mappings()[2], ParameterMapping::IndexedGroup(1));

        let staff_only = SimplePrincipal::new(1, ["staff"]);
        let both = SimplePrincipal::new(2, ["staff", "ops"]);
        assert!(!handler.is_authorized(Some(&staff_only)));
        assert!(handler.is_authorized(Some(&both)));
    }
}
