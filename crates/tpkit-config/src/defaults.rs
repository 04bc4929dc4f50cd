use crate::endpoint::HostEndpoint;
use crate::logging::LogFormat;

/// Loopback address the host application listens on.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Well-known plugin port of the host application.
pub const DEFAULT_PORT: u16 = 12136;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Idle sleep of the event loop between iterations, in milliseconds.
pub const DEFAULT_SLEEP_PERIOD_MS: u64 = 10;

/// Upper bound of a single readiness wait, in milliseconds.
pub const DEFAULT_SOCKET_EVENT_TIMEOUT_MS: u64 = 1_000;

/// Maximum number of bytes queued for transmission (32^4, i.e. 1 MiB).
pub const DEFAULT_SEND_BUFFER_LIMIT: usize = 1_048_576;

/// Size of a single socket read.
pub const DEFAULT_RECEIVE_CHUNK_SIZE: usize = 4_096;

/// Send queue lock acquisition budget before a deadlock is assumed.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 15_000;

/// Number of handler worker threads used when none is configured.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Endpoint of the host application's plugin server.
#[must_use]
pub fn default_host_endpoint() -> HostEndpoint {
    HostEndpoint::new(DEFAULT_HOST, DEFAULT_PORT)
}

pub(crate) const fn default_sleep_period_ms() -> u64 {
    DEFAULT_SLEEP_PERIOD_MS
}

pub(crate) const fn default_socket_event_timeout_ms() -> u64 {
    DEFAULT_SOCKET_EVENT_TIMEOUT_MS
}

pub(crate) const fn default_send_buffer_limit() -> usize {
    DEFAULT_SEND_BUFFER_LIMIT
}

pub(crate) const fn default_receive_chunk_size() -> usize {
    DEFAULT_RECEIVE_CHUNK_SIZE
}

pub(crate) const fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

pub(crate) const fn default_true() -> bool {
    true
}
