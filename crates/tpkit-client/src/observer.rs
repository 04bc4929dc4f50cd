//! Connection lifecycle observation.

use std::sync::Arc;

use tpkit_config::HostEndpoint;

use crate::error::ClientError;

const OBSERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Receives connection lifecycle transitions.
///
/// Callbacks run on the thread that called [`crate::Client::connect`] and
/// must not block.
pub trait ConnectionObserver: Send + Sync {
    /// Called before the TCP connection is attempted.
    fn connecting(&self, endpoint: &HostEndpoint);

    /// Called after the socket is open and the pairing message is queued.
    fn connected(&self, endpoint: &HostEndpoint, plugin_id: &str);

    /// Called when the event loop ends with an error, before teardown.
    fn fatal_error(&self, error: &ClientError);

    /// Called once the socket is closed and every handler has finished.
    fn disconnected(&self, plugin_id: &str);
}

impl<T> ConnectionObserver for Arc<T>
where
    T: ConnectionObserver + ?Sized,
{
    fn connecting(&self, endpoint: &HostEndpoint) {
        (**self).connecting(endpoint);
    }

    fn connected(&self, endpoint: &HostEndpoint, plugin_id: &str) {
        (**self).connected(endpoint, plugin_id);
    }

    fn fatal_error(&self, error: &ClientError) {
        (**self).fatal_error(error);
    }

    fn disconnected(&self, plugin_id: &str) {
        (**self).disconnected(plugin_id);
    }
}

/// Default observer that records transitions using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredConnectionObserver;

impl StructuredConnectionObserver {
    /// Builds a new observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ConnectionObserver for StructuredConnectionObserver {
    fn connecting(&self, endpoint: &HostEndpoint) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "connecting",
            endpoint = %endpoint,
            "connecting to host"
        );
    }

    fn connected(&self, endpoint: &HostEndpoint, plugin_id: &str) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "connected",
            endpoint = %endpoint,
            plugin_id,
            "connected to host"
        );
    }

    fn fatal_error(&self, error: &ClientError) {
        tracing::error!(
            target: OBSERVER_TARGET,
            event = "fatal_error",
            error = %error,
            "connection failed"
        );
    }

    fn disconnected(&self, plugin_id: &str) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "disconnected",
            plugin_id,
            "disconnected from host"
        );
    }
}
