//! Closed enumeration of the message types the host sends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::EnumString;

/// Discriminator carried in the `type` field of every host message.
///
/// Types this library does not model are preserved verbatim in
/// [`MessageKind::Other`] so subscribers can still receive them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum MessageKind {
    /// Pairing acknowledgement, sent once after the handshake.
    #[strum(serialize = "info")]
    Info,
    /// The user triggered one of the plugin's actions.
    #[strum(serialize = "action")]
    Action,
    /// A hold-capable action button was pressed.
    #[strum(serialize = "down")]
    HoldDown,
    /// A held action button was released.
    #[strum(serialize = "up")]
    HoldUp,
    /// A choice list inside an action changed.
    #[strum(serialize = "listChange")]
    ListChange,
    /// A slider bound to a plugin connector moved.
    #[strum(serialize = "connectorChange")]
    ConnectorChange,
    /// The host asks the plugin to shut down.
    #[strum(serialize = "closePlugin")]
    ClosePlugin,
    /// Host-wide event such as a page change.
    #[strum(serialize = "broadcast")]
    Broadcast,
    /// Plugin settings were edited.
    #[strum(serialize = "settings")]
    Settings,
    /// The user picked an option on a plugin notification.
    #[strum(serialize = "notificationOptionClicked")]
    NotificationOptionClicked,
    /// Any other type name.
    #[strum(default)]
    Other(String),
}

impl MessageKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::Action => "action",
            Self::HoldDown => "down",
            Self::HoldUp => "up",
            Self::ListChange => "listChange",
            Self::ConnectorChange => "connectorChange",
            Self::ClosePlugin => "closePlugin",
            Self::Broadcast => "broadcast",
            Self::Settings => "settings",
            Self::NotificationOptionClicked => "notificationOptionClicked",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Parses a wire name. Never fails; unknown names map to
    /// [`MessageKind::Other`].
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        Self::from_str(name).unwrap_or_else(|_| Self::Other(name.to_owned()))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}
