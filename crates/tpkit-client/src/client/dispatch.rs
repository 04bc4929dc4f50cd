//! Per-frame bookkeeping and hand-off to the handler pool.

use std::sync::Arc;

use tpkit_protocol::{HostEvent, Message, MessageKind, OutboundMessage};
use tracing::{debug, trace, warn};

use super::Shared;
use crate::error::ClientError;
use crate::pool::WorkerPool;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

impl Shared {
    /// Decodes one frame, applies connection side effects, and schedules its
    /// handlers.
    ///
    /// Malformed JSON is returned as an error; frames without a usable `type`
    /// and frames addressed to another plugin are dropped.
    pub(crate) fn process_frame(&self, frame: &[u8], pool: &WorkerPool) -> Result<(), ClientError> {
        let Some(message) = Message::decode(frame)? else {
            trace!(target: DISPATCH_TARGET, bytes = frame.len(), "ignoring untyped frame");
            return Ok(());
        };
        if self.options.check_plugin_id()
            && let Some(plugin_id) = message.plugin_id()
            && plugin_id != self.options.plugin_id()
        {
            debug!(
                target: DISPATCH_TARGET,
                kind = %message.kind(),
                plugin_id,
                "ignoring message for another plugin"
            );
            return Ok(());
        }
        self.apply_side_effects(&message)?;
        self.dispatch(message, pool);
        Ok(())
    }

    /// Queues handler invocations for `message` on `pool`.
    pub(crate) fn dispatch(&self, message: Message, pool: &WorkerPool) {
        let selected = self.registry.select(message.kind());
        if selected.is_empty() {
            trace!(target: DISPATCH_TARGET, kind = %message.kind(), "no subscribers");
            return;
        }
        debug!(target: DISPATCH_TARGET, kind = %message.kind(), "dispatching message");
        let registry = Arc::clone(&self.registry);
        if !pool.submit(move || registry.run(&selected, &message)) {
            warn!(target: DISPATCH_TARGET, "handler pool closed, message dropped");
        }
    }

    fn apply_side_effects(&self, message: &Message) -> Result<(), ClientError> {
        match message.kind() {
            MessageKind::ClosePlugin => {
                if self.options.auto_close() {
                    self.stop("host requested close");
                }
            }
            MessageKind::HoldDown => {
                if let Some(action_id) = message.action_id() {
                    self.held().insert(action_id.to_owned());
                }
            }
            MessageKind::HoldUp => {
                if let Some(action_id) = message.action_id() {
                    self.held().remove(action_id);
                }
            }
            MessageKind::Broadcast => {
                if self.options.update_states_on_broadcast() {
                    self.resend_states()?;
                }
            }
            MessageKind::Info | MessageKind::Settings => self.record_settings(message),
            _ => {}
        }
        Ok(())
    }

    /// Sends every cached state again, bypassing change detection.
    fn resend_states(&self) -> Result<(), ClientError> {
        let states = self.states();
        debug!(target: DISPATCH_TARGET, count = states.len(), "re-sending cached states");
        for (id, value) in states.iter() {
            self.send(&OutboundMessage::StateUpdate {
                id: id.clone(),
                value: value.clone(),
            })?;
        }
        Ok(())
    }

    /// Mirrors host-reported settings so `setting_update` only sends changes.
    fn record_settings(&self, message: &Message) {
        let values = match message.event() {
            Ok(HostEvent::Info(info)) => info.settings_map(),
            Ok(HostEvent::Settings(settings)) => settings.settings_map(),
            Ok(_) => return,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, error = %error, "unreadable settings payload");
                return;
            }
        };
        self.settings().extend(values);
    }
}
