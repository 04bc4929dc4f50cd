//! Subscription registry and handler invocation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tpkit_protocol::{Message, MessageKind};
use tracing::{error, warn};

const HANDLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handlers");

/// Error type returned by message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by message handlers.
pub type HandlerResult = Result<(), HandlerError>;

type MessageHandler = Arc<dyn Fn(&Message) -> HandlerResult + Send + Sync>;
type FailureHandler = Arc<dyn Fn(&HandlerFailure) + Send + Sync>;

/// Category a message handler subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// Messages of exactly this type.
    Kind(MessageKind),
    /// Every message, after its type-specific handlers were scheduled.
    Any,
}

impl From<MessageKind> for Event {
    fn from(kind: MessageKind) -> Self {
        Self::Kind(kind)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(formatter, "{kind}"),
            Self::Any => formatter.write_str("any"),
        }
    }
}

/// A message handler that returned an error or panicked.
///
/// Delivered to handlers registered with [`crate::Client::on_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Subscription the failing handler was registered under.
    pub subscription: Event,
    /// Type of the message being handled.
    pub message_kind: MessageKind,
    /// Error text or panic payload.
    pub reason: String,
    /// Whether the handler panicked rather than returning an error.
    pub panicked: bool,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.panicked { "panicked" } else { "failed" };
        write!(
            formatter,
            "{} handler for '{}' {outcome}: {}",
            self.subscription, self.message_kind, self.reason
        )
    }
}

impl std::error::Error for HandlerFailure {}

/// Handlers grouped by subscription, in registration order.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    by_kind: RwLock<HashMap<MessageKind, Vec<MessageHandler>>>,
    any: RwLock<Vec<MessageHandler>>,
    failures: RwLock<Vec<FailureHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandlerRegistry")
            .field(
                "kinds",
                &self
                    .by_kind
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len(),
            )
            .finish_non_exhaustive()
    }
}

/// Handlers selected for one message.
pub(crate) struct Dispatch {
    kind: MessageKind,
    typed: Vec<MessageHandler>,
    any: Vec<MessageHandler>,
}

impl Dispatch {
    pub(crate) fn is_empty(&self) -> bool {
        self.typed.is_empty() && self.any.is_empty()
    }
}

impl HandlerRegistry {
    pub(crate) fn subscribe(&self, event: Event, handler: MessageHandler) {
        match event {
            Event::Kind(kind) => self
                .by_kind
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(kind)
                .or_default()
                .push(handler),
            Event::Any => self
                .any
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handler),
        }
    }

    pub(crate) fn subscribe_failures(&self, handler: FailureHandler) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Snapshot of the handlers interested in `kind`.
    pub(crate) fn select(&self, kind: &MessageKind) -> Dispatch {
        let typed = self
            .by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
            .unwrap_or_default();
        let any = self
            .any
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Dispatch {
            kind: kind.clone(),
            typed,
            any,
        }
    }

    /// Runs `dispatch` against `message`, isolating every handler.
    pub(crate) fn run(&self, dispatch: &Dispatch, message: &Message) {
        let subscription = Event::Kind(dispatch.kind.clone());
        for handler in &dispatch.typed {
            self.invoke(handler, message, &subscription);
        }
        for handler in &dispatch.any {
            self.invoke(handler, message, &Event::Any);
        }
    }

    fn invoke(&self, handler: &MessageHandler, message: &Message, subscription: &Event) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(message)));
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => HandlerFailure {
                subscription: subscription.clone(),
                message_kind: message.kind().clone(),
                reason: error.to_string(),
                panicked: false,
            },
            Err(payload) => HandlerFailure {
                subscription: subscription.clone(),
                message_kind: message.kind().clone(),
                reason: panic_reason(payload.as_ref()),
                panicked: true,
            },
        };
        self.report(&failure);
    }

    fn report(&self, failure: &HandlerFailure) {
        let handlers = self
            .failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if handlers.is_empty() {
            warn!(target: HANDLER_TARGET, failure = %failure, "unobserved handler failure");
            return;
        }
        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(failure))).is_err() {
                error!(
                    target: HANDLER_TARGET,
                    failure = %failure,
                    "error handler panicked"
                );
            }
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("non-string panic payload")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn message(kind: &str) -> Message {
        Message::from_value(json!({"type": kind})).expect("typed message")
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> MessageHandler {
        let log = Arc::clone(log);
        Arc::new(move |_message: &Message| -> HandlerResult {
            log.lock().expect("log lock").push(label.to_owned());
            Ok(())
        })
    }

    #[test]
    fn typed_handlers_run_in_registration_order_before_any() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(Event::Any, recorder(&log, "any"));
        registry.subscribe(MessageKind::Info.into(), recorder(&log, "first"));
        registry.subscribe(MessageKind::Info.into(), recorder(&log, "second"));
        registry.subscribe(MessageKind::Action.into(), recorder(&log, "action"));

        let dispatch = registry.select(&MessageKind::Info);
        registry.run(&dispatch, &message("info"));
        assert_eq!(
            *log.lock().expect("log lock"),
            vec!["first", "second", "any"]
        );
    }

    #[test]
    fn failures_and_panics_reach_error_handlers() {
        let registry = HandlerRegistry::default();
        let failures = Arc::new(Mutex::new(Vec::new()));
        {
            let failures = Arc::clone(&failures);
            registry.subscribe_failures(Arc::new(move |failure: &HandlerFailure| {
                failures.lock().expect("failures lock").push(failure.clone());
            }));
        }
        registry.subscribe(
            MessageKind::Action.into(),
            Arc::new(|_message: &Message| -> HandlerResult { Err("bad input".into()) }),
        );
        registry.subscribe(
            Event::Any,
            Arc::new(|_message: &Message| -> HandlerResult { panic!("handler exploded") }),
        );

        let dispatch = registry.select(&MessageKind::Action);
        registry.run(&dispatch, &message("action"));

        let failures = failures.lock().expect("failures lock");
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].reason, "bad input");
        assert!(!failures[0].panicked);
        assert_eq!(failures[1].subscription, Event::Any);
        assert_eq!(failures[1].reason, "handler exploded");
        assert!(failures[1].panicked);
    }

    #[test]
    fn unknown_kinds_select_only_wildcards() {
        let registry = HandlerRegistry::default();
        let dispatch = registry.select(&MessageKind::Other(String::from("custom")));
        assert!(dispatch.is_empty());
    }
}
