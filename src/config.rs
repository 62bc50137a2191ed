//! Cache configuration

use std::time::Duration;

/// Configuration for the expiring store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live applied when an insert does not specify one
    pub default_ttl: Duration,
    /// How often the background sweep removes expired entries.
    /// A zero interval disables the sweep; lazy expiration on read
    /// still applies.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Override the default entry TTL
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Override the background sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
