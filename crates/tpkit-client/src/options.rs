//! Constructor options for [`crate::Client`].

use std::time::Duration;

use tpkit_config::{
    Config, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_WORKERS, DEFAULT_RECEIVE_CHUNK_SIZE,
    DEFAULT_SEND_BUFFER_LIMIT, DEFAULT_SLEEP_PERIOD_MS, DEFAULT_SOCKET_EVENT_TIMEOUT_MS,
    HostEndpoint,
};

/// Per-client settings.
///
/// Built either directly with [`ClientOptions::new`] and the `with_*`
/// builders, or from a layered [`Config`] with [`ClientOptions::from_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    plugin_id: String,
    endpoint: HostEndpoint,
    sleep_period: Duration,
    socket_event_timeout: Duration,
    send_buffer_limit: usize,
    receive_chunk_size: usize,
    max_frame_bytes: Option<usize>,
    lock_timeout: Duration,
    auto_close: bool,
    check_plugin_id: bool,
    update_states_on_broadcast: bool,
    workers: usize,
}

impl ClientOptions {
    /// Default options for `plugin_id`.
    #[must_use]
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            endpoint: HostEndpoint::default(),
            sleep_period: Duration::from_millis(DEFAULT_SLEEP_PERIOD_MS),
            socket_event_timeout: Duration::from_millis(DEFAULT_SOCKET_EVENT_TIMEOUT_MS),
            send_buffer_limit: DEFAULT_SEND_BUFFER_LIMIT,
            receive_chunk_size: DEFAULT_RECEIVE_CHUNK_SIZE,
            max_frame_bytes: None,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            auto_close: false,
            check_plugin_id: true,
            update_states_on_broadcast: true,
            workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// Options resolved from configuration layers.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            plugin_id: config.plugin_id.clone(),
            endpoint: config.host().clone(),
            sleep_period: config.sleep_period(),
            socket_event_timeout: config.socket_event_timeout(),
            send_buffer_limit: config.send_buffer_limit,
            receive_chunk_size: config.receive_chunk_size.max(1),
            max_frame_bytes: config.max_frame_bytes(),
            lock_timeout: config.lock_timeout(),
            auto_close: config.auto_close,
            check_plugin_id: config.check_plugin_id,
            update_states_on_broadcast: config.update_states_on_broadcast,
            workers: config.worker_count(),
        }
    }

    /// Host address to connect to.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: HostEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Idle wait after each loop iteration.
    #[must_use]
    pub const fn with_sleep_period(mut self, period: Duration) -> Self {
        self.sleep_period = period;
        self
    }

    /// Upper bound of one readiness wait.
    #[must_use]
    pub const fn with_socket_event_timeout(mut self, timeout: Duration) -> Self {
        self.socket_event_timeout = timeout;
        self
    }

    /// Maximum queued outbound bytes.
    #[must_use]
    pub const fn with_send_buffer_limit(mut self, limit: usize) -> Self {
        self.send_buffer_limit = limit;
        self
    }

    /// Bytes requested per socket read. Zero is raised to one.
    #[must_use]
    pub fn with_receive_chunk_size(mut self, size: usize) -> Self {
        self.receive_chunk_size = size.max(1);
        self
    }

    /// Cap on an unterminated inbound line; `None` leaves it unbounded.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Send queue lock budget.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Disconnect automatically on `closePlugin`.
    #[must_use]
    pub const fn with_auto_close(mut self, enabled: bool) -> Self {
        self.auto_close = enabled;
        self
    }

    /// Drop messages whose `pluginId` names another plugin.
    #[must_use]
    pub const fn with_check_plugin_id(mut self, enabled: bool) -> Self {
        self.check_plugin_id = enabled;
        self
    }

    /// Re-send cached states on every `broadcast`.
    #[must_use]
    pub const fn with_update_states_on_broadcast(mut self, enabled: bool) -> Self {
        self.update_states_on_broadcast = enabled;
        self
    }

    /// Handler worker threads. Zero is raised to one.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Plugin identifier.
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Host address.
    #[must_use]
    pub const fn endpoint(&self) -> &HostEndpoint {
        &self.endpoint
    }

    /// Idle wait after each loop iteration.
    #[must_use]
    pub const fn sleep_period(&self) -> Duration {
        self.sleep_period
    }

    /// Upper bound of one readiness wait.
    #[must_use]
    pub const fn socket_event_timeout(&self) -> Duration {
        self.socket_event_timeout
    }

    /// Maximum queued outbound bytes.
    #[must_use]
    pub const fn send_buffer_limit(&self) -> usize {
        self.send_buffer_limit
    }

    /// Bytes requested per socket read.
    #[must_use]
    pub const fn receive_chunk_size(&self) -> usize {
        self.receive_chunk_size
    }

    /// Cap on an unterminated inbound line.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> Option<usize> {
        self.max_frame_bytes
    }

    /// Send queue lock budget.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Whether `closePlugin` disconnects automatically.
    #[must_use]
    pub const fn auto_close(&self) -> bool {
        self.auto_close
    }

    /// Whether foreign `pluginId`s are filtered.
    #[must_use]
    pub const fn check_plugin_id(&self) -> bool {
        self.check_plugin_id
    }

    /// Whether `broadcast` re-sends cached states.
    #[must_use]
    pub const fn update_states_on_broadcast(&self) -> bool {
        self.update_states_on_broadcast
    }

    /// Handler worker threads.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_values_flow_into_options() {
        let config = Config {
            plugin_id: String::from("tp.plugin.demo"),
            host: HostEndpoint::new("127.0.0.1", 4100),
            auto_close: true,
            max_frame_bytes: 2048,
            max_workers: 0,
            ..Config::default()
        };
        let options = ClientOptions::from_config(&config);
        assert_eq!(options.plugin_id(), "tp.plugin.demo");
        assert_eq!(options.endpoint().port(), 4100);
        assert!(options.auto_close());
        assert_eq!(options.max_frame_bytes(), Some(2048));
        assert_eq!(options.workers(), DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn defaults_agree_with_config_defaults() {
        let from_config = ClientOptions::from_config(&Config {
            plugin_id: String::from("p"),
            ..Config::default()
        });
        assert_eq!(from_config, ClientOptions::new("p"));
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let options = ClientOptions::new("p")
            .with_workers(0)
            .with_receive_chunk_size(0);
        assert_eq!(options.workers(), 1);
        assert_eq!(options.receive_chunk_size(), 1);
    }
}
