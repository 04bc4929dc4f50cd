//! Typed views over inbound host messages.
//!
//! Every field is optional because the host omits keys freely between API
//! versions. Unknown keys are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::kind::MessageKind;
use crate::message::Message;

/// A host message decoded according to its `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Pairing acknowledgement.
    Info(InfoEvent),
    /// Action invocation.
    Action(ActionEvent),
    /// Hold-capable action pressed.
    HoldDown(ActionEvent),
    /// Hold-capable action released.
    HoldUp(ActionEvent),
    /// Choice list changed.
    ListChange(ListChangeEvent),
    /// Connector (slider) moved.
    ConnectorChange(ConnectorChangeEvent),
    /// Shutdown request.
    ClosePlugin(ClosePluginEvent),
    /// Host-wide broadcast.
    Broadcast(BroadcastEvent),
    /// Settings changed.
    Settings(SettingsEvent),
    /// Notification option selected.
    NotificationOptionClicked(NotificationClickEvent),
    /// A type this library does not model; inspect [`Message::body`].
    Other(String),
}

impl HostEvent {
    pub(crate) fn from_message(message: &Message) -> Result<Self, ProtocolError> {
        let kind = message.kind();
        let event = match kind {
            MessageKind::Info => Self::Info(view(message)?),
            MessageKind::Action => Self::Action(view(message)?),
            MessageKind::HoldDown => Self::HoldDown(view(message)?),
            MessageKind::HoldUp => Self::HoldUp(view(message)?),
            MessageKind::ListChange => Self::ListChange(view(message)?),
            MessageKind::ConnectorChange => Self::ConnectorChange(view(message)?),
            MessageKind::ClosePlugin => Self::ClosePlugin(view(message)?),
            MessageKind::Broadcast => Self::Broadcast(view(message)?),
            MessageKind::Settings => Self::Settings(view(message)?),
            MessageKind::NotificationOptionClicked => {
                Self::NotificationOptionClicked(view(message)?)
            }
            MessageKind::Other(name) => Self::Other(name.clone()),
        };
        Ok(event)
    }
}

fn view<T: DeserializeOwned>(message: &Message) -> Result<T, ProtocolError> {
    serde_json::from_value(message.to_value()).map_err(|source| ProtocolError::InvalidShape {
        kind: message.kind().to_string(),
        source,
    })
}

/// Collapses the host's `[{"name": "value"}, ...]` settings layout.
fn flatten_settings(entries: &[Map<String, Value>]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .flat_map(|entry| entry.iter())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Payload of the `info` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InfoEvent {
    /// Pairing status reported by the host.
    pub status: Option<String>,
    /// Plugin SDK version the host speaks.
    pub sdk_version: Option<u32>,
    /// Human-readable host version.
    pub tp_version_string: Option<String>,
    /// Numeric host version.
    pub tp_version_code: Option<u64>,
    /// Plugin version from the definition file.
    pub plugin_version: Option<u64>,
    /// Current plugin settings as single-entry objects.
    pub settings: Vec<Map<String, Value>>,
}

impl InfoEvent {
    /// Settings keyed by name.
    #[must_use]
    pub fn settings_map(&self) -> BTreeMap<String, Value> {
        flatten_settings(&self.settings)
    }
}

/// One `{"id": ..., "value": ...}` entry of an action's data list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActionDataItem {
    /// Data field identifier.
    pub id: Option<String>,
    /// User supplied value.
    pub value: Option<Value>,
}

/// Payload shared by `action`, `down`, and `up` messages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionEvent {
    /// Owning plugin.
    pub plugin_id: Option<String>,
    /// Action identifier.
    pub action_id: Option<String>,
    /// Action data fields.
    pub data: Vec<ActionDataItem>,
}

impl ActionEvent {
    /// Looks up a data value.
    ///
    /// With `Some(id)` the value of the first item with that id is returned.
    /// With `None` (or an empty id) the first item carrying any value wins.
    #[must_use]
    pub fn data_value(&self, id: Option<&str>) -> Option<&Value> {
        action_data_value(&self.data, id)
    }
}

/// Free-standing form of [`ActionEvent::data_value`] for raw data lists.
#[must_use]
pub fn action_data_value<'a>(data: &'a [ActionDataItem], id: Option<&str>) -> Option<&'a Value> {
    match id.filter(|id| !id.is_empty()) {
        Some(id) => data
            .iter()
            .find(|item| item.id.as_deref() == Some(id))
            .and_then(|item| item.value.as_ref()),
        None => data
            .iter()
            .find_map(|item| item.value.as_ref().filter(|value| !value.is_null())),
    }
}

/// Payload of the `listChange` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListChangeEvent {
    /// Owning plugin.
    pub plugin_id: Option<String>,
    /// Action containing the list.
    pub action_id: Option<String>,
    /// Data field of the list.
    pub list_id: Option<String>,
    /// Button instance the list belongs to.
    pub instance_id: Option<String>,
    /// Newly selected value.
    pub value: Option<String>,
}

/// Payload of the `connectorChange` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectorChangeEvent {
    /// Owning plugin.
    pub plugin_id: Option<String>,
    /// Connector identifier.
    pub connector_id: Option<String>,
    /// Slider position, 0 to 100.
    pub value: Option<i64>,
    /// Connector data fields.
    pub data: Vec<ActionDataItem>,
}

/// Payload of the `closePlugin` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosePluginEvent {
    /// Plugin being closed.
    pub plugin_id: Option<String>,
}

/// Payload of the `broadcast` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BroadcastEvent {
    /// Broadcast name, e.g. `pageChange`.
    pub event: Option<String>,
    /// Page now shown on the device, for page changes.
    pub page_name: Option<String>,
}

/// Payload of the `settings` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsEvent {
    /// Settings as single-entry objects.
    pub values: Vec<Map<String, Value>>,
}

impl SettingsEvent {
    /// Settings keyed by name.
    #[must_use]
    pub fn settings_map(&self) -> BTreeMap<String, Value> {
        flatten_settings(&self.values)
    }
}

/// Payload of the `notificationOptionClicked` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationClickEvent {
    /// Notification the option belongs to.
    pub notification_id: Option<String>,
    /// Option the user picked.
    pub option_id: Option<String>,
}
