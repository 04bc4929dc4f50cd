//! Socket client for plugins of the host automation application.
//!
//! A [`Client`] keeps one loopback TCP connection to the host, exchanges
//! newline-delimited JSON with it, and hands every inbound message to the
//! handlers registered with [`Client::on`]. Three kinds of thread cooperate:
//!
//! - the thread that calls [`Client::connect`] runs the event loop, which
//!   waits for socket readiness, frames inbound bytes, applies connection
//!   bookkeeping (held actions, plugin id filtering, `closePlugin`
//!   auto-close, state re-broadcast), and drains the send queue;
//! - a fixed pool of workers runs handlers so slow handlers never stall the
//!   socket;
//! - any application thread may call [`Client::send`] and the convenience
//!   methods, which serialise a message and append it to a bounded,
//!   mutex-guarded send queue.
//!
//! Host-initiated shutdown and connection failure look the same to handlers:
//! both deliver a `closePlugin` message. [`Client::connect`] still tells them
//! apart by returning `Ok(())` or the fatal [`ClientError`].
//!
//! ```no_run
//! use tpkit_client::{Client, ClientOptions, MessageKind};
//!
//! let client = Client::new(ClientOptions::new("tp.plugin.example"));
//! let sender = client.clone();
//! client.on(MessageKind::Info, move |_message| {
//!     sender.state_update("tp.plugin.example.status", "ready")?;
//!     Ok(())
//! });
//! client.connect()?;
//! # Ok::<(), tpkit_client::ClientError>(())
//! ```

mod client;
mod error;
mod handlers;
mod observer;
mod options;
mod pool;
mod readiness;
mod send_queue;
pub mod telemetry;

pub use client::{Client, StateDefinition};
pub use error::ClientError;
pub use handlers::{Event, HandlerError, HandlerFailure, HandlerResult};
pub use observer::{ConnectionObserver, StructuredConnectionObserver};
pub use options::ClientOptions;
pub use tpkit_protocol::{Message, MessageKind, NotificationOption, action_data_value};

#[cfg(test)]
mod tests;
