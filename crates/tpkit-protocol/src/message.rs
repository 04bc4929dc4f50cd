//! Decoded inbound messages.

use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::event::HostEvent;
use crate::kind::MessageKind;

const TYPE_FIELD: &str = "type";
const PLUGIN_ID_FIELD: &str = "pluginId";
const ACTION_ID_FIELD: &str = "actionId";

/// A JSON object received from the host together with its parsed `type`.
///
/// The full object is kept so handlers see exactly what the host sent; typed
/// access is available through [`Message::event`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: MessageKind,
    body: Map<String, Value>,
}

impl Message {
    /// Decodes one frame.
    ///
    /// Returns `Ok(None)` for frames that carry nothing actionable: JSON
    /// values that are not objects, and objects without a string `type`
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] when the frame is not valid JSON,
    /// including blank lines.
    pub fn decode(frame: &[u8]) -> Result<Option<Self>, ProtocolError> {
        let value: Value =
            serde_json::from_slice(frame).map_err(|source| ProtocolError::Decode { source })?;
        Ok(Self::from_value(value))
    }

    /// Wraps an already parsed JSON value, if it is an object with a `type`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(body) = value else {
            return None;
        };
        // Only string types map onto `MessageKind`; other `type` values are
        // dropped rather than forwarded to wildcard handlers.
        let kind = body
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(MessageKind::from_wire)?;
        Some(Self { kind, body })
    }

    /// Builds a message containing only the `type` field.
    ///
    /// The client uses this to announce connection loss with the same
    /// `closePlugin` message the host would send.
    #[must_use]
    pub fn synthetic(kind: MessageKind) -> Self {
        let mut body = Map::new();
        body.insert(TYPE_FIELD.to_owned(), Value::String(kind.to_string()));
        Self { kind, body }
    }

    /// Message type.
    #[must_use]
    pub const fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// The complete JSON object.
    #[must_use]
    pub const fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Field lookup on the raw object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// String field lookup; missing, empty, and non-string values are `None`.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Plugin the message is addressed to, when the host says so.
    #[must_use]
    pub fn plugin_id(&self) -> Option<&str> {
        self.str_field(PLUGIN_ID_FIELD)
    }

    /// Action identifier carried by action and hold messages.
    #[must_use]
    pub fn action_id(&self) -> Option<&str> {
        self.str_field(ACTION_ID_FIELD)
    }

    /// Copies the message into a plain JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// Consumes the message, returning the JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }

    /// Typed view of the message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidShape`] when a known field has the wrong
    /// JSON type. Missing fields are tolerated and surface as `None`.
    pub fn event(&self) -> Result<HostEvent, ProtocolError> {
        HostEvent::from_message(self)
    }
}
