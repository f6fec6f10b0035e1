//! Registry of the running bots' senders.
//!
//! The runtime registers each bot's [`Sender`](courier_core::Sender) when its
//! runner starts, so application code can message a bot outside of a
//! handler, e.g. from a scheduled task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use courier_core::{BoxedSender, DEFAULT_BOT};

/// Map of bot name to its sender. Cheap to clone; clones share the map.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: Arc<RwLock<HashMap<String, BoxedSender>>>,
}

impl SenderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the sender of bot `name`, replacing any previous one.
    pub async fn register(&self, name: impl Into<String>, sender: BoxedSender) {
        let name = name.into();
        debug!(bot = %name, "Registered sender");
        self.senders.write().await.insert(name, sender);
    }

    /// Removes the sender of bot `name`.
    pub async fn unregister(&self, name: &str) -> Option<BoxedSender> {
        self.senders.write().await.remove(name)
    }

    /// Gets the sender of bot `name`.
    pub async fn get(&self, name: &str) -> Option<BoxedSender> {
        self.senders.read().await.get(name).cloned()
    }

    /// Gets the sender of the default bot.
    pub async fn default_sender(&self) -> Option<BoxedSender> {
        self.get(DEFAULT_BOT).await
    }

    /// Returns all registered bot names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.senders.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered senders.
    pub async fn count(&self) -> usize {
        self.senders.read().await.len()
    }
}

impl std::fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::NullSender;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = SenderRegistry::new();
        registry.register("", Arc::new(NullSender)).await;
        registry.register("ops", Arc::new(NullSender)).await;

        assert!(registry.default_sender().await.is_some());
        assert!(registry.get("ops").await.is_some());
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.names().await, vec!["".to_string(), "ops".to_string()]);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let registry = SenderRegistry::new();
        let clone = registry.clone();
        clone.register("ops", Arc::new(NullSender)).await;
        assert_eq!(registry.count().await, 1);

        assert!(registry.unregister("ops").await.is_some());
        assert!(clone.get("ops").await.is_none());
    }
}
