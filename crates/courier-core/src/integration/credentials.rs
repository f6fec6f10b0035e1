//! Bot identity credentials.

use serde::{Deserialize, Serialize};

/// Name of the bot used when controllers do not name one.
pub const DEFAULT_BOT: &str = "";

/// Credentials of one bot identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCredentials {
    /// API token issued by the platform.
    pub token: String,
    /// Public username of the bot.
    pub username: String,
}

impl BotCredentials {
    /// Creates a credential pair.
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

// The token must never end up in logs.
impl std::fmt::Debug for BotCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotCredentials")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let creds = BotCredentials::new("123:secret", "my_bot");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("my_bot"));
    }
}
