//! Server configuration.

use std::time::Duration;

/// Configuration for the sync endpoint.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of items (upserts plus deletes, both families) in one
    /// pushed change set.
    pub max_push_batch: usize,
    /// Lifetime of minted bearer tokens.
    pub token_expiry: Duration,
    /// Whether credentials go through the authenticator.
    ///
    /// When disabled the credential is taken to be the user id itself. Only
    /// meant for local development.
    pub require_auth: bool,
}

impl ServerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            max_push_batch: 1000,
            token_expiry: Duration::from_secs(24 * 60 * 60), // 24 hours
            require_auth: true,
        }
    }

    /// Sets the maximum push batch size.
    pub fn with_max_push_batch(mut self, size: usize) -> Self {
        self.max_push_batch = size;
        self
    }

    /// Sets the token lifetime.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Enables or disables authentication.
    pub fn with_require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_push_batch, 1000);
        assert!(config.require_auth);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_max_push_batch(10)
            .with_token_expiry(Duration::from_secs(60))
            .with_require_auth(false);

        assert_eq!(config.max_push_batch, 10);
        assert_eq!(config.token_expiry, Duration::from_secs(60));
        assert!(!config.require_auth);
    }
}
