//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for sync orchestration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between identity confirmation and the first sync attempt,
    /// giving dependent subsystems time to settle.
    pub start_delay: Duration,
}

impl SyncConfig {
    /// Creates a configuration with the default start delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_delay: Duration::from_secs(1),
        }
    }

    /// Sets the delay before the first sync after identity confirmation.
    #[must_use]
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
