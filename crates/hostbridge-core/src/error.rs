//! Error types for the bridge

use core::fmt;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by native entry points and the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Required argument was not passed
    MissingArgument(usize),

    /// Argument has the wrong managed type
    InvalidArgument {
        index: usize,
        expected: &'static str,
    },

    /// Named resource does not exist
    ResourceNotFound(String),

    /// Resource exists but could not be read
    ReadFailed(String),

    /// Resource content is larger than the read buffer allows
    CapacityExceeded { capacity: usize },

    /// Worker pool is shut down or its queue is full
    WorkerUnavailable,

    /// Thread-safe function queue is full (non-blocking call)
    QueueFull,

    /// Handle is closing or already closed
    Closing,

    /// Work was cancelled before it executed
    Cancelled,

    /// Managed code touched from a thread other than the runtime thread
    WrongThread,

    /// A handle scope could not be opened (runtime tearing down)
    ScopeUnavailable,

    /// Invoking managed code or a native step failed
    CallFailed(String),

    /// Runtime configuration rejected
    InvalidConfig(String),

    /// OS error with errno
    Os(i32),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::MissingArgument(i) => write!(f, "missing argument {}", i),
            BridgeError::InvalidArgument { index, expected } => {
                write!(f, "argument {} must be {}", index, expected)
            }
            BridgeError::ResourceNotFound(name) => write!(f, "resource not found: {}", name),
            BridgeError::ReadFailed(name) => write!(f, "failed to read resource: {}", name),
            BridgeError::CapacityExceeded { capacity } => {
                write!(f, "resource exceeds read capacity of {} bytes", capacity)
            }
            BridgeError::WorkerUnavailable => write!(f, "worker pool unavailable"),
            BridgeError::QueueFull => write!(f, "thread-safe function queue full"),
            BridgeError::Closing => write!(f, "handle is closing"),
            BridgeError::Cancelled => write!(f, "work cancelled"),
            BridgeError::WrongThread => write!(f, "called off the runtime thread"),
            BridgeError::ScopeUnavailable => write!(f, "handle scope unavailable"),
            BridgeError::CallFailed(msg) => write!(f, "call failed: {}", msg),
            BridgeError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            BridgeError::Os(e) => write!(f, "OS error: errno {}", e),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        match e.raw_os_error() {
            Some(errno) => BridgeError::Os(errno),
            None => BridgeError::CallFailed(e.to_string()),
        }
    }
}
