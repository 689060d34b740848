//! Runtime configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables
//! 3. `defaults`
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env()
//!     .num_workers(2)
//!     .read_capacity(4096);
//! ```

pub mod defaults;

use std::time::Duration;

use hostbridge_core::BridgeError;
use hostbridge_core::{env_get, env_get_duration_ms, env_get_duration_us, kinfo};

/// Runtime configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker threads in the async work pool
    pub num_workers: usize,
    /// Maximum queued async work items
    pub queue_depth: usize,
    /// Maximum bytes read from one resource
    pub read_capacity: usize,
    /// Pending call slots per thread-safe function
    pub tsfn_queue_size: usize,
    /// Idle worker park timeout
    pub idle_park: Duration,
    /// Upper bound on one runtime wait between inbox checks
    pub run_wait: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `HOSTBRIDGE_NUM_WORKERS`
    /// - `HOSTBRIDGE_QUEUE_DEPTH`
    /// - `HOSTBRIDGE_READ_CAPACITY`
    /// - `HOSTBRIDGE_TSFN_QUEUE_SIZE`
    /// - `HOSTBRIDGE_IDLE_PARK_US`
    /// - `HOSTBRIDGE_RUN_WAIT_MS`
    pub fn from_env() -> Self {
        Self {
            num_workers: env_get("HOSTBRIDGE_NUM_WORKERS", defaults::NUM_WORKERS),
            queue_depth: env_get("HOSTBRIDGE_QUEUE_DEPTH", defaults::QUEUE_DEPTH),
            read_capacity: env_get("HOSTBRIDGE_READ_CAPACITY", defaults::READ_CAPACITY),
            tsfn_queue_size: env_get("HOSTBRIDGE_TSFN_QUEUE_SIZE", defaults::TSFN_QUEUE_SIZE),
            idle_park: env_get_duration_us("HOSTBRIDGE_IDLE_PARK_US", defaults::IDLE_PARK_US),
            run_wait: env_get_duration_ms("HOSTBRIDGE_RUN_WAIT_MS", defaults::RUN_WAIT_MS),
        }
    }

    /// Defaults only, no environment lookup. Useful for tests.
    pub fn new() -> Self {
        Self {
            num_workers: defaults::NUM_WORKERS,
            queue_depth: defaults::QUEUE_DEPTH,
            read_capacity: defaults::READ_CAPACITY,
            tsfn_queue_size: defaults::TSFN_QUEUE_SIZE,
            idle_park: Duration::from_micros(defaults::IDLE_PARK_US),
            run_wait: Duration::from_millis(defaults::RUN_WAIT_MS),
        }
    }

    // Builder methods

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn queue_depth(mut self, n: usize) -> Self {
        self.queue_depth = n;
        self
    }

    pub fn read_capacity(mut self, bytes: usize) -> Self {
        self.read_capacity = bytes;
        self
    }

    pub fn tsfn_queue_size(mut self, n: usize) -> Self {
        self.tsfn_queue_size = n;
        self
    }

    pub fn idle_park(mut self, d: Duration) -> Self {
        self.idle_park = d;
        self
    }

    pub fn run_wait(mut self, d: Duration) -> Self {
        self.run_wait = d;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::InvalidValue("num_workers must be > 0"));
        }
        if self.num_workers > 64 {
            return Err(ConfigError::InvalidValue("num_workers must be <= 64"));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidValue("queue_depth must be > 0"));
        }
        if self.read_capacity == 0 {
            return Err(ConfigError::InvalidValue("read_capacity must be > 0"));
        }
        if self.tsfn_queue_size == 0 {
            return Err(ConfigError::InvalidValue("tsfn_queue_size must be > 0"));
        }
        if self.run_wait.is_zero() {
            return Err(ConfigError::InvalidValue("run_wait must be > 0"));
        }
        Ok(())
    }

    /// Log configuration at info level
    pub fn log(&self) {
        kinfo!("hostbridge runtime configuration:");
        kinfo!("  num_workers:      {}", self.num_workers);
        kinfo!("  queue_depth:      {}", self.queue_depth);
        kinfo!("  read_capacity:    {}", self.read_capacity);
        kinfo!("  tsfn_queue_size:  {}", self.tsfn_queue_size);
        kinfo!("  idle_park:        {:?}", self.idle_park);
        kinfo!("  run_wait:         {:?}", self.run_wait);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for BridgeError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => BridgeError::InvalidConfig(msg.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_defaults_valid() {
        let config = RuntimeConfig::new();
        assert_eq!(config.read_capacity, 50_000);
        assert_eq!(config.num_workers, defaults::NUM_WORKERS);
        assert!(config.validate().is_ok());
    }

    /// Serializes tests that mutate `HOSTBRIDGE_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_env_override() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("HOSTBRIDGE_READ_CAPACITY", "1234");
        let config = RuntimeConfig::from_env();
        std::env::remove_var("HOSTBRIDGE_READ_CAPACITY");
        assert_eq!(config.read_capacity, 1234);
    }

    #[test]
    fn test_from_env_without_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .num_workers(2)
            .queue_depth(8)
            .run_wait(Duration::from_millis(1));
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.queue_depth, 8);
        assert_eq!(config.run_wait, Duration::from_millis(1));
    }

    #[test]
    fn test_validation() {
        assert!(RuntimeConfig::new().num_workers(0).validate().is_err());
        assert!(RuntimeConfig::new().num_workers(1000).validate().is_err());
        assert_eq!(
            RuntimeConfig::new().read_capacity(0).validate(),
            Err(ConfigError::InvalidValue("read_capacity must be > 0"))
        );
    }
}
