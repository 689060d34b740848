//! Environment variable utilities
//!
//! Typed lookups with defaults, used by `RuntimeConfig::from_env()` and the
//! logging setup.
//!
//! ```ignore
//! use hostbridge_core::env::{env_get, env_get_bool, env_get_duration_us};
//!
//! let workers: usize = env_get("HOSTBRIDGE_NUM_WORKERS", 4);
//! let park = env_get_duration_us("HOSTBRIDGE_IDLE_PARK_US", 1000);
//! let flush = env_get_bool("HOSTBRIDGE_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Parse `key` as `T`, falling back to `default` when unset or unparseable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean lookup. "1", "true", "yes", "on" (any case) are true; any other
/// set value is false; unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Microsecond count as a `Duration`
#[inline]
pub fn env_get_duration_us(key: &str, default_us: u64) -> Duration {
    Duration::from_micros(env_get(key, default_us))
}

/// Millisecond count as a `Duration`
#[inline]
pub fn env_get_duration_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_get(key, default_ms))
}
