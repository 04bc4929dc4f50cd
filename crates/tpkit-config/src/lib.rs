//! Shared configuration for plugins built on `tpkit`.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `TPKIT_CONFIG_PATH`), then `TPKIT_*`
//! environment variables, then command-line flags. The client crate turns a
//! resolved [`Config`] into its constructor options, so nothing here is
//! process-global.

use std::time::Duration;

pub use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_WORKERS, DEFAULT_PORT,
    DEFAULT_RECEIVE_CHUNK_SIZE, DEFAULT_SEND_BUFFER_LIMIT, DEFAULT_SLEEP_PERIOD_MS,
    DEFAULT_SOCKET_EVENT_TIMEOUT_MS, default_host_endpoint, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use endpoint::{EndpointParseError, HostEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TPKIT")]
pub struct Config {
    /// Plugin identifier announced in the pairing handshake.
    #[serde(default)]
    pub plugin_id: String,
    /// Address of the host's plugin server.
    #[serde(default = "defaults::default_host_endpoint")]
    pub host: HostEndpoint,
    /// `tracing` filter directive, e.g. `info` or `tpkit_client=debug`.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Telemetry output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Idle sleep between event loop iterations, in milliseconds.
    #[serde(default = "defaults::default_sleep_period_ms")]
    pub sleep_period_ms: u64,
    /// Upper bound of a single readiness wait, in milliseconds.
    #[serde(default = "defaults::default_socket_event_timeout_ms")]
    pub socket_event_timeout_ms: u64,
    /// Maximum number of bytes waiting in the send queue.
    #[serde(default = "defaults::default_send_buffer_limit")]
    pub send_buffer_limit: usize,
    /// Bytes requested per socket read.
    #[serde(default = "defaults::default_receive_chunk_size")]
    pub receive_chunk_size: usize,
    /// Longest accepted unterminated line; `0` disables the check.
    #[serde(default)]
    pub max_frame_bytes: usize,
    /// Send queue lock budget in milliseconds.
    #[serde(default = "defaults::default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Disconnect as soon as the host asks the plugin to close.
    #[serde(default)]
    pub auto_close: bool,
    /// Drop messages addressed to a different plugin id.
    #[serde(default = "defaults::default_true")]
    pub check_plugin_id: bool,
    /// Re-send every cached state value when the host broadcasts a page change.
    #[serde(default = "defaults::default_true")]
    pub update_states_on_broadcast: bool,
    /// Handler worker threads; `0` selects the library default.
    #[serde(default)]
    pub max_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_id: String::new(),
            host: defaults::default_host_endpoint(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            sleep_period_ms: defaults::default_sleep_period_ms(),
            socket_event_timeout_ms: defaults::default_socket_event_timeout_ms(),
            send_buffer_limit: defaults::default_send_buffer_limit(),
            receive_chunk_size: defaults::default_receive_chunk_size(),
            max_frame_bytes: 0,
            lock_timeout_ms: defaults::default_lock_timeout_ms(),
            auto_close: false,
            check_plugin_id: true,
            update_states_on_broadcast: true,
            max_workers: 0,
        }
    }
}

impl Config {
    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Telemetry output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Host endpoint.
    #[must_use]
    pub const fn host(&self) -> &HostEndpoint {
        &self.host
    }

    /// Idle sleep between event loop iterations.
    #[must_use]
    pub const fn sleep_period(&self) -> Duration {
        Duration::from_millis(self.sleep_period_ms)
    }

    /// Upper bound of a single readiness wait.
    #[must_use]
    pub const fn socket_event_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_event_timeout_ms)
    }

    /// Send queue lock budget.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Frame size cap, if one is configured.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> Option<usize> {
        if self.max_frame_bytes == 0 {
            None
        } else {
            Some(self.max_frame_bytes)
        }
    }

    /// Worker pool size, falling back to [`DEFAULT_MAX_WORKERS`].
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        if self.max_workers == 0 {
            DEFAULT_MAX_WORKERS
        } else {
            self.max_workers
        }
    }
}
