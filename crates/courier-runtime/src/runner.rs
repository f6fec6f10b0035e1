//! The polling loop of one bot.
//!
//! A [`BotRunner`] pulls batches from its [`UpdateSource`] and dispatches
//! every update in order, one at a time, until its cancellation token
//! fires. Dispatch itself never fails; a failed poll is logged and retried
//! after the configured delay.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use courier_core::UpdateSource;
use courier_framework::{Dispatcher, ProcessingOutcome};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Counters collected by a runner over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Number of updates dispatched.
    pub processed: u64,
    /// Number of failed polls.
    pub poll_failures: u64,
    /// Dispatched updates per outcome.
    pub by_outcome: BTreeMap<ProcessingOutcome, u64>,
}

impl RunnerStats {
    fn record(&mut self, outcome: ProcessingOutcome) {
        self.processed += 1;
        *self.by_outcome.entry(outcome).or_default() += 1;
    }

    /// Number of updates that ended with `outcome`.
    pub fn count(&self, outcome: ProcessingOutcome) -> u64 {
        self.by_outcome.get(&outcome).copied().unwrap_or(0)
    }

    /// Adds the counters of `other`.
    pub fn absorb(&mut self, other: &RunnerStats) {
        self.processed += other.processed;
        self.poll_failures += other.poll_failures;
        for (outcome, count) in &other.by_outcome {
            *self.by_outcome.entry(*outcome).or_default() += count;
        }
    }
}

impl std::fmt::Display for RunnerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} update(s) processed", self.processed)?;
        for (outcome, count) in &self.by_outcome {
            write!(f, ", {outcome}: {count}")?;
        }
        if self.poll_failures > 0 {
            write!(f, ", {} failed poll(s)", self.poll_failures)?;
        }
        Ok(())
    }
}

/// Drives one bot's dispatcher from its update source.
pub struct BotRunner {
    dispatcher: Dispatcher,
    source: Arc<dyn UpdateSource>,
    retry_delay: Duration,
    shutdown: CancellationToken,
}

impl BotRunner {
    /// Creates a runner with its own cancellation token.
    pub fn new(dispatcher: Dispatcher, source: Arc<dyn UpdateSource>) -> Self {
        Self {
            dispatcher,
            source,
            retry_delay: DEFAULT_RETRY_DELAY,
            shutdown: CancellationToken::new(),
        }
    }

    /// Sets the delay before polling again after a failed poll.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Stops the runner when `token` is cancelled.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// A handle that stops this runner when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until cancelled and returns the collected counters.
    ///
    /// Cancellation is observed while waiting for updates and between
    /// updates; an update already being dispatched runs to completion.
    pub async fn run(self) -> RunnerStats {
        let bot = self.dispatcher.binding().name().to_string();
        let mut stats = RunnerStats::default();
        info!(bot = %bot, "Bot runner started");

        'polling: loop {
            let batch = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break 'polling,
                batch = self.source.next_updates() => batch,
            };

            match batch {
                Ok(updates) => {
                    if !updates.is_empty() {
                        debug!(bot = %bot, count = updates.len(), "Received updates");
                    }
                    for update in updates {
                        if self.shutdown.is_cancelled() {
                            break 'polling;
                        }
                        let outcome = self.dispatcher.dispatch(update).await;
                        stats.record(outcome);
                    }
                }
                Err(err) => {
                    stats.poll_failures += 1;
                    error!(
                        bot = %bot,
                        error = %err,
                        retry_in = ?self.retry_delay,
                        "Failed to poll updates"
                    );
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break 'polling,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        info!(bot = %bot, stats = %stats, "Bot runner stopped");
        stats
    }
}

impl std::fmt::Debug for BotRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRunner")
            .field("dispatcher", &self.dispatcher)
            .field("retry_delay", &self.retry_delay)
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
