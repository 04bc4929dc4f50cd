//! The plugin client: connection lifecycle, caches, and the public API.
//!
//! [`Client::connect`] opens the socket, queues the pairing message, and runs
//! the event loop on the calling thread until the host, the application, or a
//! fatal error stops it. Handlers run on a worker pool and may call back into
//! any method of a cloned [`Client`].

mod api;
mod dispatch;
mod event_loop;

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tpkit_config::HostEndpoint;
use tpkit_protocol::{Message, MessageKind, OutboundMessage, encode_line};
use tracing::{debug, info, warn};

pub use self::api::StateDefinition;
use self::event_loop::EventLoop;
use crate::error::ClientError;
use crate::handlers::{Event, HandlerFailure, HandlerRegistry, HandlerResult};
use crate::observer::{ConnectionObserver, StructuredConnectionObserver};
use crate::options::ClientOptions;
use crate::pool::WorkerPool;
use crate::send_queue::SendQueue;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Handle to one plugin connection.
///
/// Cloning is cheap and every clone refers to the same connection, caches,
/// and handler registry.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Client")
            .field("plugin_id", &self.shared.options.plugin_id())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// State shared between the public handle, the event loop, and handlers.
pub(crate) struct Shared {
    options: ClientOptions,
    queue: SendQueue,
    registry: Arc<HandlerRegistry>,
    observer: Arc<dyn ConnectionObserver>,
    /// Set while a session is running; cleared by any stop.
    running: AtomicBool,
    /// Set for the whole duration of `connect()`.
    active: AtomicBool,
    control: Mutex<Option<TcpStream>>,
    fatal: Mutex<Option<ClientError>>,
    states: Mutex<HashMap<String, String>>,
    settings: Mutex<HashMap<String, Value>>,
    held: Mutex<HashSet<String>>,
}

impl Client {
    /// Builds a disconnected client that logs lifecycle events via `tracing`.
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        Self::with_observer(options, Arc::new(StructuredConnectionObserver::new()))
    }

    /// Builds a disconnected client reporting to `observer`.
    #[must_use]
    pub fn with_observer(options: ClientOptions, observer: Arc<dyn ConnectionObserver>) -> Self {
        let queue = SendQueue::new(options.send_buffer_limit(), options.lock_timeout());
        Self {
            shared: Arc::new(Shared {
                options,
                queue,
                registry: Arc::new(HandlerRegistry::default()),
                observer,
                running: AtomicBool::new(false),
                active: AtomicBool::new(false),
                control: Mutex::new(None),
                fatal: Mutex::new(None),
                states: Mutex::new(HashMap::new()),
                settings: Mutex::new(HashMap::new()),
                held: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Options the client was built with.
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.shared.options
    }

    /// Plugin identifier used for pairing and filtering.
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        self.shared.options.plugin_id()
    }

    /// Registers `handler` for `event`.
    ///
    /// Handlers for one message type run in registration order, followed by
    /// the [`Event::Any`] handlers. An `Err` or a panic is reported to the
    /// [`Client::on_error`] handlers and does not affect the connection.
    pub fn on<F>(&self, event: impl Into<Event>, handler: F)
    where
        F: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(event.into(), Arc::new(handler));
    }

    /// Registers `handler` for failures of other handlers.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&HandlerFailure) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe_failures(Arc::new(handler));
    }

    /// Connects, pairs, and runs the event loop until the session ends.
    ///
    /// Returns immediately with `Ok(())` if a session is already running, and
    /// with [`ClientError::Busy`] if one is still starting or tearing down
    /// (for example when a `closePlugin` handler reconnects). Otherwise
    /// blocks until [`Client::disconnect`] is called, the host's `closePlugin`
    /// triggers auto-close, or a fatal error occurs. On a fatal error every
    /// `closePlugin` handler first receives a synthetic
    /// `{"type":"closePlugin"}` message, then the socket is closed and the
    /// error is returned. Queued handler invocations finish before this call
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] as described above, the connection error
    /// (`Resolve`, `Connect`, `NonBlocking`, `WorkerPool`) if the session
    /// could not start, or the fatal error (`PeerClosed`, `Io`, `Protocol`,
    /// `LockTimeout`, `SendBufferFull`) that ended it.
    pub fn connect(&self) -> Result<(), ClientError> {
        if self.shared.active.swap(true, Ordering::SeqCst) {
            if self.shared.is_connected() {
                debug!(target: LIFECYCLE_TARGET, "connect ignored, session already running");
                return Ok(());
            }
            return Err(ClientError::Busy);
        }
        let outcome = self.run_session();
        self.shared.active.store(false, Ordering::SeqCst);
        outcome
    }

    /// Stops the running session. Does nothing when already stopped.
    ///
    /// The event loop notices within one iteration; unsent data is dropped.
    pub fn disconnect(&self) {
        self.shared.stop("disconnect requested");
    }

    /// Whether a session is running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Serialises `message` and queues it for transmission.
    ///
    /// Intended for host messages the convenience methods do not cover.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] without a session,
    /// [`ClientError::SendBufferFull`] when the queue cannot take the message,
    /// [`ClientError::LockTimeout`] when the queue lock is stuck (this also
    /// ends the session), and [`ClientError::Protocol`] if serialisation
    /// fails.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), ClientError> {
        self.shared.send(message)
    }

    fn run_session(&self) -> Result<(), ClientError> {
        let shared = &*self.shared;
        let endpoint = shared.options.endpoint();
        shared.observer.connecting(endpoint);

        let stream = open_stream(endpoint)?;
        let control = stream
            .try_clone()
            .map_err(|source| ClientError::io("clone", source))?;
        let pool = WorkerPool::start(shared.options.workers())?;
        shared.begin(control)?;

        let outcome = shared
            .send(&OutboundMessage::Pair {
                id: shared.options.plugin_id().to_owned(),
            })
            .and_then(|()| {
                shared
                    .observer
                    .connected(endpoint, shared.options.plugin_id());
                EventLoop::new(shared, &pool, stream).run()
            })
            .and_then(|()| shared.take_fatal().map_or(Ok(()), Err));

        if let Err(error) = &outcome {
            shared.observer.fatal_error(error);
            shared.dispatch(Message::synthetic(MessageKind::ClosePlugin), &pool);
        }
        shared.teardown();
        pool.join();
        shared.observer.disconnected(shared.options.plugin_id());
        outcome
    }
}

impl Shared {
    pub(crate) fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let line = encode_line(message)?;
        match self.queue.enqueue(&line) {
            Err(ClientError::LockTimeout { waited }) => {
                self.escalate(ClientError::LockTimeout { waited });
                Err(ClientError::LockTimeout { waited })
            }
            other => other,
        }
    }

    fn begin(&self, control: TcpStream) -> Result<(), ClientError> {
        self.queue.open()?;
        *lock(&self.control) = Some(control);
        *lock(&self.fatal) = None;
        lock(&self.held).clear();
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Ends the session if it is running; returns whether this call did so.
    pub(crate) fn stop(&self, reason: &'static str) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        info!(target: LIFECYCLE_TARGET, reason, "stopping connection");
        self.release();
        true
    }

    /// Ends the session from a caller thread with a fatal error that
    /// `connect()` will report.
    fn escalate(&self, error: ClientError) {
        warn!(target: LIFECYCLE_TARGET, error = %error, "escalating to fatal shutdown");
        let mut fatal = lock(&self.fatal);
        if fatal.is_none() {
            *fatal = Some(error);
        }
        drop(fatal);
        self.running.store(false, Ordering::SeqCst);
    }

    fn take_fatal(&self) -> Option<ClientError> {
        lock(&self.fatal).take()
    }

    fn teardown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.release();
    }

    fn release(&self) {
        self.queue.close();
        let Some(control) = lock(&self.control).take() else {
            return;
        };
        match control.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotConnected => {
                debug!(target: LIFECYCLE_TARGET, "socket already closed by peer");
            }
            Err(error) => {
                warn!(target: LIFECYCLE_TARGET, error = %error, "socket shutdown failed");
            }
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, String>> {
        lock(&self.states)
    }

    fn settings(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        lock(&self.settings)
    }

    fn held(&self) -> MutexGuard<'_, HashSet<String>> {
        lock(&self.held)
    }
}

/// Locks `mutex`, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_stream(endpoint: &HostEndpoint) -> Result<TcpStream, ClientError> {
    let host = endpoint.host();
    let port = endpoint.port();
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| ClientError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                stream
                    .set_nonblocking(true)
                    .map_err(|source| ClientError::NonBlocking { source })?;
                return Ok(stream);
            }
            Err(source) => {
                debug!(target: LIFECYCLE_TARGET, %addr, error = %source, "connect attempt failed");
                last_error = Some(ClientError::Connect { addr, source });
            }
        }
    }
    Err(last_error.unwrap_or_else(|| ClientError::ResolveEmpty {
        host: host.to_owned(),
        port,
    }))
}

#[cfg(test)]
impl Client {
    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }
}

#[cfg(test)]
impl Shared {
    /// Marks the session running without a socket so dispatch and the
    /// convenience API can be exercised directly.
    pub(crate) fn start_detached(&self) {
        self.queue.open().expect("open send queue");
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn queued_lines(&self) -> Vec<serde_json::Value> {
        let mut sink = Vec::new();
        while self.queue.drain(&mut sink).expect("drain to memory") > 0 {}
        sink.split(|byte| *byte == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).expect("queued line is JSON"))
            .collect()
    }

    pub(crate) fn queue(&self) -> &SendQueue {
        &self.queue
    }
}
