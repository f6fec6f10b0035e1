//! Multi-bot runtime orchestration.
//!
//! [`CourierRuntime`] turns configuration and registered controllers into
//! running bots:
//!
//! 1. Controllers are bound per bot name; bots disabled in the configuration
//!    are skipped, a bot without credentials aborts startup.
//! 2. A [`TransportFactory`] creates one sender and update source per bot.
//! 3. One [`BotRunner`] per bot is spawned as an independent task.
//! 4. On Ctrl+C (or SIGTERM, or a custom shutdown future) every runner is
//!    cancelled and its counters collected.
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::builder().profile("production").build()?;
//! runtime.register_controller(echo_controller()).await;
//! let stats = runtime.run().await?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use courier_core::{BoxedSender, UpdateSource};
use courier_framework::{
    BotBinding, BotConfiguration, Controller, ControllerBinder, Dispatcher, UpdateHooks,
};

use crate::config::{BotConfig, ConfigLoader, ConfigResult, CourierConfig, PollingConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::SenderRegistry;
use crate::runner::{BotRunner, RunnerStats};

/// The two halves of a bot's platform connection.
#[derive(Clone)]
pub struct Transport {
    /// Outbound side, handed to the dispatcher.
    pub sender: BoxedSender,
    /// Inbound side, polled by the runner.
    pub source: Arc<dyn UpdateSource>,
}

impl Transport {
    /// Uses one value for both halves.
    pub fn from_shared<T>(transport: Arc<T>) -> Self
    where
        T: courier_core::Sender + UpdateSource + 'static,
    {
        Self {
            sender: transport.clone(),
            source: transport,
        }
    }
}

/// Creates the transport of a configured bot.
pub trait TransportFactory: Send + Sync {
    fn create(&self, bot: &BotConfig, polling: &PollingConfig) -> RuntimeResult<Transport>;
}

/// Creates Bot API transports over HTTP.
#[cfg(feature = "http-client")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramTransportFactory;

#[cfg(feature = "http-client")]
impl TransportFactory for TelegramTransportFactory {
    fn create(&self, bot: &BotConfig, polling: &PollingConfig) -> RuntimeResult<Transport> {
        use courier_transport::{TelegramApi, TelegramConfig};

        let config = TelegramConfig::new(bot.token.clone())
            .api_url(bot.api_url.clone())
            .poll_timeout(polling.timeout())
            .limit(polling.limit);
        Ok(Transport::from_shared(Arc::new(TelegramApi::new(config)?)))
    }
}

/// Counters of every runner, by bot name.
#[derive(Debug, Clone, Default)]
pub struct RuntimeStats {
    pub bots: BTreeMap<String, RunnerStats>,
}

impl RuntimeStats {
    /// The counters of all bots combined.
    pub fn total(&self) -> RunnerStats {
        let mut total = RunnerStats::default();
        for stats in self.bots.values() {
            total.absorb(stats);
        }
        total
    }
}

/// The Courier runtime: one polling loop per configured bot.
pub struct CourierRuntime {
    config: CourierConfig,
    binder: RwLock<ControllerBinder>,
    configurations: RwLock<HashMap<String, Arc<dyn BotConfiguration>>>,
    hooks: RwLock<HashMap<String, Arc<dyn UpdateHooks>>>,
    transport_factory: RwLock<Option<Arc<dyn TransportFactory>>>,
    senders: SenderRegistry,
    shutdown: Mutex<CancellationToken>,
    running: RwLock<bool>,
}

impl CourierRuntime {
    /// Creates a runtime from the configuration found in the default
    /// locations, falling back to defaults if it cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                CourierConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging.
    pub fn from_config(config: &CourierConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            bots = config.bots.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            binder: RwLock::new(ControllerBinder::new()),
            configurations: RwLock::new(HashMap::new()),
            hooks: RwLock::new(HashMap::new()),
            transport_factory: RwLock::new(Self::default_transport_factory()),
            senders: SenderRegistry::new(),
            shutdown: Mutex::new(CancellationToken::new()),
            running: RwLock::new(false),
        }
    }

    #[cfg(feature = "http-client")]
    fn default_transport_factory() -> Option<Arc<dyn TransportFactory>> {
        debug!("Using the HTTP Bot API transport");
        Some(Arc::new(TelegramTransportFactory))
    }

    #[cfg(not(feature = "http-client"))]
    fn default_transport_factory() -> Option<Arc<dyn TransportFactory>> {
        None
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// The senders of the running bots.
    pub fn senders(&self) -> &SenderRegistry {
        &self.senders
    }

    /// A token that stops the current run, or the next one if the runtime
    /// is idle, when cancelled. Every finished run installs a fresh token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.lock().clone()
    }

    /// Requests shutdown of the current run, or of the next one if the
    /// runtime is idle.
    pub fn stop(&self) {
        self.shutdown.lock().cancel();
    }

    /// Returns whether the runtime is currently running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Registers a controller.
    pub async fn register_controller(&self, controller: Controller) {
        debug!(controller = %controller.name(), bot = %controller.bot_name(), "Registered controller");
        self.binder.write().await.add(controller);
    }

    /// Registers several controllers.
    pub async fn register_controllers(&self, controllers: impl IntoIterator<Item = Controller>) {
        let mut binder = self.binder.write().await;
        for controller in controllers {
            binder.add(controller);
        }
    }

    /// Sets the principal and context configuration of bot `bot`.
    pub async fn set_configuration(&self, bot: impl Into<String>, configuration: impl BotConfiguration + 'static) {
        self.configurations
            .write()
            .await
            .insert(bot.into(), Arc::new(configuration));
    }

    /// Sets the hooks of bot `bot`.
    pub async fn set_hooks(&self, bot: impl Into<String>, hooks: impl UpdateHooks + 'static) {
        self.hooks.write().await.insert(bot.into(), Arc::new(hooks));
    }

    /// Replaces the transport factory.
    pub async fn set_transport_factory(&self, factory: impl TransportFactory + 'static) {
        *self.transport_factory.write().await = Some(Arc::new(factory));
    }

    /// Binds the registered controllers of every enabled bot.
    pub async fn bind(&self) -> RuntimeResult<Vec<BotBinding>> {
        let registered = self.binder.read().await;
        let mut binder = ControllerBinder::new();

        for controller in registered.controllers() {
            match self.config.bot(controller.bot_name()) {
                Some(bot) if !bot.enabled => {
                    info!(
                        controller = %controller.name(),
                        bot = %bot.display_name(),
                        "Skipping controller of disabled bot"
                    );
                }
                _ => binder.add(controller.clone()),
            }
        }

        let bound = binder.bot_names();
        for bot in self.config.enabled_bots() {
            if !bound.contains(&bot.name) {
                warn!(bot = %bot.display_name(), "Bot has no controllers and will not be started");
            }
        }

        let bindings = binder.bind(|name| self.config.credentials(name))?;
        Ok(bindings.into_values().collect())
    }

    /// Runs the runtime until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<RuntimeStats> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs the runtime until `shutdown` completes or [`stop`](Self::stop) is called.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<RuntimeStats>
    where
        F: Future<Output = ()>,
    {
        {
            let mut running = self.running.write().await;
            if *running {
                return Err(RuntimeError::AlreadyRunning);
            }
            *running = true;
        }

        let token = self.shutdown_token();
        let result = self.supervise(shutdown, &token).await;
        if token.is_cancelled() {
            *self.shutdown.lock() = CancellationToken::new();
        }
        *self.running.write().await = false;
        result
    }

    async fn supervise<F>(&self, shutdown: F, token: &CancellationToken) -> RuntimeResult<RuntimeStats>
    where
        F: Future<Output = ()>,
    {
        let runners = self.prepare_runners(token).await?;
        info!("Starting {} bot(s)", runners.len());

        let mut tasks = JoinSet::new();
        for (name, runner) in runners {
            tasks.spawn(async move { (name, runner.run().await) });
        }

        info!("Courier runtime is now running. Press Ctrl+C to stop.");
        tokio::select! {
            _ = shutdown => {}
            _ = token.cancelled() => {}
        }

        info!("Stopping Courier runtime");
        token.cancel();

        let mut stats = RuntimeStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, runner_stats)) => {
                    self.senders.unregister(&name).await;
                    stats.bots.insert(name, runner_stats);
                }
                Err(err) => error!(error = %err, "Bot runner task failed"),
            }
        }

        info!(stats = %stats.total(), "Runtime stopped");
        Ok(stats)
    }

    /// Binds every bot and creates its transport. Nothing is spawned unless
    /// every bot could be prepared.
    async fn prepare_runners(&self, token: &CancellationToken) -> RuntimeResult<Vec<(String, BotRunner)>> {
        let bindings = self.bind().await?;
        let factory = self.transport_factory.read().await.clone();
        let configurations = self.configurations.read().await;
        let hooks = self.hooks.read().await;

        let mut runners = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let name = binding.name().to_string();
            let bot = self.config.bot(&name).ok_or_else(|| RuntimeError::NoTransport {
                bot: name.clone(),
            })?;
            let factory = factory
                .as_ref()
                .ok_or_else(|| RuntimeError::NoTransport { bot: name.clone() })?;
            let transport = factory.create(bot, &self.config.polling)?;

            let mut builder = Dispatcher::builder(binding, transport.sender.clone());
            if let Some(configuration) = configurations.get(&name) {
                builder = builder.shared_configuration(configuration.clone());
            }
            if let Some(hooks) = hooks.get(&name) {
                builder = builder.shared_hooks(hooks.clone());
            }

            let runner = BotRunner::new(builder.build(), transport.source)
                .retry_delay(self.config.polling.retry_delay())
                .shutdown_token(token.child_token());
            runners.push((name, runner, transport.sender));
        }

        let mut prepared = Vec::with_capacity(runners.len());
        for (name, runner, sender) in runners {
            self.senders.register(name.clone(), sender).await;
            prepared.push((name, runner));
        }
        Ok(prepared)
    }
}

impl Default for CourierRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for Ctrl+C, or SIGTERM on Unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(err) => warn!(error = %err, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => error!(error = %err, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`CourierRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<CourierRuntime> {
        let config = self.config_loader.load()?;
        Ok(CourierRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{NullSender, ScriptedSource, message_update, ping_controller};
    use courier_framework::ProcessingOutcome;
    use parking_lot::Mutex;

    /// Serves scripted updates and cancels `drained` once a bot ran dry.
    struct ScriptedFactory {
        updates: Mutex<HashMap<String, Vec<courier_core::Update>>>,
        drained: CancellationToken,
    }

    impl ScriptedFactory {
        fn new(drained: CancellationToken) -> Self {
            Self {
                updates: Mutex::new(HashMap::new()),
                drained,
            }
        }

        fn with_updates(self, bot: &str, updates: Vec<courier_core::Update>) -> Self {
            self.updates.lock().insert(bot.to_string(), updates);
            self
        }
    }

    impl TransportFactory for ScriptedFactory {
        fn create(&self, bot: &BotConfig, _polling: &PollingConfig) -> RuntimeResult<Transport> {
            let updates = self.updates.lock().remove(&bot.name).unwrap_or_default();
            Ok(Transport {
                sender: Arc::new(NullSender),
                source: Arc::new(ScriptedSource::new([Ok(updates)], self.drained.clone())),
            })
        }
    }

    fn runtime_with(bots: Vec<BotConfig>) -> CourierRuntime {
        CourierRuntime::from_config(&CourierConfig {
            bots,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_runs_default_bot_until_shutdown() {
        let runtime = runtime_with(vec![BotConfig::new("", "1:main")]);
        runtime.register_controller(ping_controller("")).await;

        let drained = CancellationToken::new();
        runtime
            .set_transport_factory(
                ScriptedFactory::new(drained.clone())
                    .with_updates("", vec![message_update(1, "ping"), message_update(2, "nope")]),
            )
            .await;

        let stats = runtime
            .run_until(async move { drained.cancelled().await })
            .await
            .unwrap();

        let bot = &stats.bots[""];
        assert_eq!(bot.processed, 2);
        assert_eq!(bot.count(ProcessingOutcome::HandlerCompleted), 1);
        assert_eq!(bot.count(ProcessingOutcome::NoHandler), 1);
        assert!(!runtime.is_running().await);
        assert_eq!(runtime.senders().count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_abort_startup() {
        let runtime = runtime_with(vec![]);
        runtime.register_controller(ping_controller("ops")).await;
        runtime
            .set_transport_factory(ScriptedFactory::new(CancellationToken::new()))
            .await;

        let result = runtime.run_until(futures::future::pending()).await;
        assert!(matches!(
            result,
            Err(RuntimeError::Binding(courier_framework::ConfigError::MissingCredentials { .. }))
        ));
        assert_eq!(runtime.senders().count().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_bot_is_skipped() {
        let mut ops = BotConfig::new("ops", "2:ops");
        ops.enabled = false;
        let runtime = runtime_with(vec![BotConfig::new("", "1:main"), ops]);
        runtime
            .register_controllers([ping_controller(""), ping_controller("ops")])
            .await;

        let bindings = runtime.bind().await.unwrap();
        let names: Vec<&str> = bindings.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec![""]);
    }

    #[tokio::test]
    async fn test_stop_ends_run() {
        let runtime = runtime_with(vec![BotConfig::new("", "1:main")]);
        runtime.register_controller(ping_controller("")).await;
        runtime
            .set_transport_factory(ScriptedFactory::new(CancellationToken::new()))
            .await;

        runtime.stop();
        let stats = runtime.run_until(futures::future::pending()).await.unwrap();
        assert_eq!(stats.total().processed, 0);
    }

    #[tokio::test]
    async fn test_runtime_runs_again_after_stop() {
        let runtime = runtime_with(vec![BotConfig::new("", "1:main")]);
        runtime.register_controller(ping_controller("")).await;
        runtime
            .set_transport_factory(ScriptedFactory::new(CancellationToken::new()))
            .await;

        runtime.stop();
        runtime.run_until(futures::future::pending()).await.unwrap();
        assert!(!runtime.shutdown_token().is_cancelled());

        let drained = CancellationToken::new();
        runtime
            .set_transport_factory(
                ScriptedFactory::new(drained.clone()).with_updates("", vec![message_update(1, "ping")]),
            )
            .await;
        let stats = runtime
            .run_until(async move { drained.cancelled().await })
            .await
            .unwrap();
        assert_eq!(stats.bots[""].count(ProcessingOutcome::HandlerCompleted), 1);
    }

    #[cfg(not(feature = "http-client"))]
    #[tokio::test]
    async fn test_no_transport_without_factory() {
        let runtime = runtime_with(vec![BotConfig::new("", "1:main")]);
        runtime.register_controller(ping_controller("")).await;

        let result = runtime.run_until(futures::future::pending()).await;
        assert!(matches!(result, Err(RuntimeError::NoTransport { .. })));
    }
}
