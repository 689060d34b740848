//! Compile-time defaults. Every value can be overridden through the
//! environment variable named next to it.

/// `HOSTBRIDGE_NUM_WORKERS`
pub const NUM_WORKERS: usize = 4;

/// `HOSTBRIDGE_QUEUE_DEPTH` - pending async work before submission fails
pub const QUEUE_DEPTH: usize = 256;

/// `HOSTBRIDGE_READ_CAPACITY` - bytes
pub const READ_CAPACITY: usize = hostbridge_core::constants::DEFAULT_READ_CAPACITY;

/// `HOSTBRIDGE_TSFN_QUEUE_SIZE` - pending calls per thread-safe function
pub const TSFN_QUEUE_SIZE: usize = 16;

/// `HOSTBRIDGE_IDLE_PARK_US` - idle worker park timeout
pub const IDLE_PARK_US: u64 = 1000;

/// `HOSTBRIDGE_RUN_WAIT_MS` - longest the runtime sleeps between checks
pub const RUN_WAIT_MS: u64 = 10;
