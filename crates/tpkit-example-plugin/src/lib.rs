//! A small demonstration plugin for the host application.
//!
//! [`run`] resolves configuration, starts telemetry, registers the handlers
//! in [`ExamplePlugin::install`], and blocks in [`Client::connect`] until the
//! host closes the plugin or the process receives a termination signal.
//!
//! The plugin exposes one state (`tpkit.example.status`), a toggle action, a
//! hold-to-repeat action that counts presses, and a slider connector that
//! mirrors the toggle value.

use std::ffi::OsString;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde_json::Value;
use tpkit_client::{Client, ClientOptions, Message, MessageKind, telemetry};
use tpkit_config::{Config, OrthoConfig};
use tpkit_protocol::HostEvent;
use tracing::{info, warn};

/// Plugin id used when the configuration leaves it blank.
pub const DEFAULT_PLUGIN_ID: &str = "tpkit.example";
/// State reflecting the toggle.
pub const STATUS_STATE: &str = "tpkit.example.status";
/// State counting hold-to-repeat presses.
pub const COUNTER_STATE: &str = "tpkit.example.counter";
/// Action that flips [`STATUS_STATE`].
pub const TOGGLE_ACTION: &str = "tpkit.example.toggle";
/// Hold-capable action that increments [`COUNTER_STATE`].
pub const REPEAT_ACTION: &str = "tpkit.example.repeat";
/// Connector (without the plugin prefix) moved to 0 or 100 with the toggle.
pub const LEVEL_CONNECTOR: &str = "level";

const PLUGIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin");

/// Loads configuration from `args` and the environment, then runs the plugin
/// until the session ends.
///
/// # Errors
///
/// Fails when configuration cannot be loaded, telemetry cannot start, the
/// signal listener cannot be installed, or the session ends with a fatal
/// client error.
pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = Config::load_from_iter(args).context("loading configuration")?;
    let _telemetry = telemetry::initialise(&config).context("starting telemetry")?;
    let client = Client::new(options_for(&config));
    ExamplePlugin::default().install(&client);

    let signals = signals::watch(&client).context("installing signal handlers")?;
    let outcome = client.connect();
    signals.stop();
    outcome.with_context(|| format!("plugin session for '{}' failed", client.plugin_id()))
}

/// Client options for `config`, substituting [`DEFAULT_PLUGIN_ID`] for a blank
/// plugin id.
#[must_use]
pub fn options_for(config: &Config) -> ClientOptions {
    if config.plugin_id.trim().is_empty() {
        let mut config = config.clone();
        config.plugin_id = DEFAULT_PLUGIN_ID.to_owned();
        return ClientOptions::from_config(&config);
    }
    ClientOptions::from_config(config)
}

/// Handler wiring for the demonstration plugin.
#[derive(Debug, Default, Clone)]
pub struct ExamplePlugin {
    presses: Arc<AtomicU64>,
}

impl ExamplePlugin {
    /// Registers every handler on `client`.
    pub fn install(&self, client: &Client) {
        let on_info = client.clone();
        client.on(MessageKind::Info, move |message: &Message| {
            if let HostEvent::Info(info) = message.event()? {
                info!(
                    target: PLUGIN_TARGET,
                    host = info.tp_version_string.as_deref().unwrap_or("unknown"),
                    settings = info.settings.len(),
                    "paired with host"
                );
            }
            on_info.create_state(STATUS_STATE, "Example status", "off")?;
            on_info.create_state(COUNTER_STATE, "Example press counter", "0")?;
            Ok(())
        });

        let on_action = client.clone();
        client.on(MessageKind::Action, move |message: &Message| {
            if message.action_id() == Some(TOGGLE_ACTION) {
                toggle(&on_action)?;
            }
            Ok(())
        });

        let on_down = client.clone();
        let presses = Arc::clone(&self.presses);
        client.on(MessageKind::HoldDown, move |message: &Message| {
            if message.action_id() != Some(REPEAT_ACTION) {
                return Ok(());
            }
            let count = presses.fetch_add(1, Ordering::SeqCst) + 1;
            on_down.state_update(COUNTER_STATE, &count.to_string())?;
            Ok(())
        });

        client.on(MessageKind::Settings, |message: &Message| {
            if let HostEvent::Settings(settings) = message.event()? {
                for (name, value) in settings.settings_map() {
                    info!(target: PLUGIN_TARGET, name = %name, value = %value, "setting changed");
                }
            }
            Ok(())
        });

        let on_close = client.clone();
        client.on(MessageKind::ClosePlugin, move |_message: &Message| {
            info!(target: PLUGIN_TARGET, "host asked the plugin to close");
            on_close.disconnect();
            Ok(())
        });

        client.on_error(|failure| {
            warn!(target: PLUGIN_TARGET, failure = %failure, "handler failed");
        });
    }

    /// Hold-to-repeat presses counted so far.
    #[must_use]
    pub fn presses(&self) -> u64 {
        self.presses.load(Ordering::SeqCst)
    }
}

/// Flips the status state and moves the connector to match.
fn toggle(client: &Client) -> Result<(), tpkit_client::ClientError> {
    let next = match client.current_state(STATUS_STATE).as_deref() {
        Some("on") => "off",
        _ => "on",
    };
    client.state_update(STATUS_STATE, next)?;
    client.connector_update(LEVEL_CONNECTOR, if next == "on" { 100 } else { 0 })?;
    client.setting_update("Last toggle", Value::from(next))
}

#[cfg(unix)]
mod signals {
    use std::io;
    use std::thread::{self, JoinHandle};

    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::iterator::{Handle, Signals};
    use tpkit_client::Client;
    use tracing::info;

    use super::PLUGIN_TARGET;

    /// Background thread that disconnects the client on a termination signal.
    pub(crate) struct SignalWatcher {
        handle: Handle,
        thread: JoinHandle<()>,
    }

    pub(crate) fn watch(client: &Client) -> io::Result<SignalWatcher> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])?;
        let handle = signals.handle();
        let client = client.clone();
        let thread = thread::Builder::new()
            .name("tpkit-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(target: PLUGIN_TARGET, signal, "shutdown signal received");
                    client.disconnect();
                }
            })?;
        Ok(SignalWatcher { handle, thread })
    }

    impl SignalWatcher {
        pub(crate) fn stop(self) {
            self.handle.close();
            if self.thread.join().is_err() {
                tracing::warn!(target: PLUGIN_TARGET, "signal thread panicked");
            }
        }
    }
}

#[cfg(not(unix))]
mod signals {
    use std::io;

    use tpkit_client::Client;

    pub(crate) struct SignalWatcher;

    pub(crate) const fn watch(_client: &Client) -> io::Result<SignalWatcher> {
        Ok(SignalWatcher)
    }

    impl SignalWatcher {
        pub(crate) const fn stop(self) {}
    }
}
