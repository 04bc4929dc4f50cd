//! Error types surfaced by the client.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tpkit_protocol::ProtocolError;

/// Failures reported by [`crate::Client`].
///
/// Connection-level variants (`Io`, `PeerClosed`, `Protocol`, `LockTimeout`)
/// end the session when they occur inside the event loop. Caller usage errors
/// (`NotConnected`, `InvalidArgument`, `UnknownState`, and `SendBufferFull`
/// when returned from [`crate::Client::send`]) leave the connection untouched.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The host name could not be resolved.
    #[error("failed to resolve host {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no address.
    #[error("no addresses resolved for host {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Opening the TCP connection failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address tried last.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The socket could not be switched to non-blocking mode.
    #[error("failed to configure non-blocking socket: {source}")]
    NonBlocking {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An operation needed a live connection.
    #[error("client is not connected")]
    NotConnected,
    /// `connect()` was called while another session was starting up or
    /// tearing down.
    #[error("a session is still starting or shutting down")]
    Busy,
    /// The connection stopped while the caller waited for the send queue.
    #[error("connection stopped before the message could be queued")]
    Stopped,
    /// Queuing the message would exceed the send buffer limit.
    #[error("send buffer is full: {pending} bytes queued, {incoming} more would exceed {limit}")]
    SendBufferFull {
        /// Bytes already queued.
        pending: usize,
        /// Size of the rejected message.
        incoming: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The send queue lock was not acquired in time; treated as a deadlock.
    #[error("send queue lock not acquired within {waited:?}, assuming deadlock")]
    LockTimeout {
        /// Configured budget.
        waited: Duration,
    },
    /// The host closed its end of the socket.
    #[error("host closed the connection")]
    PeerClosed,
    /// A socket operation failed.
    #[error("socket {operation} failed: {source}")]
    Io {
        /// What the event loop was doing.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The host sent something that could not be framed or decoded, or an
    /// outbound message failed to serialise.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A convenience method received an argument it cannot send.
    #[error("invalid argument to {operation}: {message}")]
    InvalidArgument {
        /// Method name.
        operation: &'static str,
        /// What was wrong.
        message: String,
    },
    /// `remove_state` was asked to validate an id it never created.
    #[error("state '{id}' does not exist")]
    UnknownState {
        /// Requested state id.
        id: String,
    },
    /// A handler worker thread could not be started.
    #[error("failed to start handler worker: {source}")]
    WorkerPool {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ClientError {
    pub(crate) fn invalid_argument(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            message: message.into(),
        }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }

    /// Returns `true` for errors that end the connection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PeerClosed | Self::Io { .. } | Self::Protocol(_) | Self::LockTimeout { .. }
        )
    }
}
