//! Wire types for the host's plugin protocol.
//!
//! The host and its plugins exchange UTF-8 JSON objects, one per line, over a
//! loopback TCP connection. Every object carries a `type` string. This crate
//! owns the byte-level framing ([`FrameBuffer`]), the inbound message model
//! ([`Message`], [`MessageKind`], and the typed [`HostEvent`] views), and the
//! outbound [`OutboundMessage`] union. It performs no I/O.

mod error;
mod event;
mod frame;
mod kind;
mod message;
mod outbound;

pub use error::ProtocolError;
pub use event::{
    ActionDataItem, ActionEvent, BroadcastEvent, ClosePluginEvent, ConnectorChangeEvent,
    HostEvent, InfoEvent, ListChangeEvent, NotificationClickEvent, SettingsEvent,
    action_data_value,
};
pub use frame::{Frame, FrameBuffer};
pub use kind::MessageKind;
pub use message::Message;
pub use outbound::{
    ActionDataBounds, NotificationOption, OutboundMessage, encode_line,
};
