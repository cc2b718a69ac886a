//! Relay configuration.

use std::fmt;
use std::time::Duration;

/// Identifying tag on every order the relay places.
pub const RELAY_MAGIC: u64 = 86421357;

/// Maximum price deviation in points for relay orders.
pub const DEFAULT_DEVIATION: u32 = 20;

/// Configuration for signal handling and the terminal connection.
#[derive(Clone)]
pub struct RelayConfig {
    /// Shared secret every signal must carry
    pub shared_secret: String,

    /// How long a signal waits for the terminal connection
    pub ready_timeout: Duration,

    /// Connection attempts made at startup
    pub connect_attempts: u32,

    /// Pause between failed connection attempts
    pub connect_retry_delay: Duration,

    /// Price deviation tolerance in points
    pub deviation: u32,

    /// Magic number tagging relay orders
    pub magic: u64,
}

impl RelayConfig {
    pub fn with_secret(shared_secret: impl Into<String>) -> Self {
        Self {
            shared_secret: shared_secret.into(),
            ..Default::default()
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            ready_timeout: Duration::from_secs(10),
            connect_attempts: 5,
            connect_retry_delay: Duration::from_secs(2),
            deviation: DEFAULT_DEVIATION,
            magic: RELAY_MAGIC,
        }
    }
}

// Keeps the secret out of logs
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("shared_secret", &"***")
            .field("ready_timeout", &self.ready_timeout)
            .field("connect_attempts", &self.connect_attempts)
            .field("connect_retry_delay", &self.connect_retry_delay)
            .field("deviation", &self.deviation)
            .field("magic", &self.magic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let config = RelayConfig::with_secret("TopSecret!");
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("TopSecret!"));
        assert!(rendered.contains("magic: 86421357"));
        assert_eq!(config.connect_attempts, 5);
    }
}
