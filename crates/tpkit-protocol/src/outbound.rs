//! Messages the plugin sends to the host.

use serde::Serialize;
use serde_json::Value;

use crate::error::ProtocolError;

/// One option button on a host notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOption {
    /// Identifier echoed back in `notificationOptionClicked`.
    pub id: String,
    /// Button label.
    pub title: String,
}

impl NotificationOption {
    /// Builds an option.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Numeric bounds for one action data field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDataBounds {
    /// Data field identifier.
    pub id: String,
    /// Data field type; the host only accepts `number` here.
    #[serde(rename = "type")]
    pub data_type: &'static str,
    /// Lower bound.
    pub min_value: f64,
    /// Upper bound.
    pub max_value: f64,
}

impl ActionDataBounds {
    /// Builds numeric bounds for `id`.
    #[must_use]
    pub fn number(id: impl Into<String>, min_value: f64, max_value: f64) -> Self {
        Self {
            id: id.into(),
            data_type: "number",
            min_value,
            max_value,
        }
    }
}

/// Every message type the plugin may send.
///
/// Serialises to the host's JSON layout with the variant name as `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Handshake carrying the plugin id.
    Pair {
        /// Plugin identifier.
        id: String,
    },
    /// Declares a state at runtime.
    CreateState {
        /// State identifier.
        id: String,
        /// Label shown in the host UI.
        desc: String,
        /// Initial value.
        #[serde(rename = "defaultValue")]
        default_value: String,
    },
    /// Removes a runtime state.
    RemoveState {
        /// State identifier.
        id: String,
    },
    /// Sets a state value.
    StateUpdate {
        /// State identifier.
        id: String,
        /// New value.
        value: String,
    },
    /// Replaces the values of a choice list, optionally for one instance.
    ChoiceUpdate {
        /// Choice list identifier.
        id: String,
        /// Restricts the update to one button instance.
        #[serde(rename = "instanceId", skip_serializing_if = "Option::is_none")]
        instance_id: Option<String>,
        /// Allowed values.
        value: Vec<String>,
    },
    /// Changes a plugin setting.
    SettingUpdate {
        /// Setting name as declared in the plugin definition.
        name: String,
        /// New value.
        value: Value,
    },
    /// Shows a notification with option buttons.
    #[serde(rename_all = "camelCase")]
    ShowNotification {
        /// Notification identifier.
        notification_id: String,
        /// Title line.
        title: String,
        /// Body text.
        msg: String,
        /// Option buttons.
        options: Vec<NotificationOption>,
    },
    /// Moves a connector slider.
    #[serde(rename_all = "camelCase")]
    ConnectorUpdate {
        /// Fully prefixed connector id.
        connector_id: String,
        /// Position, as a decimal string.
        value: String,
    },
    /// Changes action data bounds on one button instance.
    #[serde(rename_all = "camelCase")]
    UpdateActionData {
        /// Button instance.
        instance_id: String,
        /// New bounds.
        data: ActionDataBounds,
    },
}

impl OutboundMessage {
    /// Wire name of the message type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Pair { .. } => "pair",
            Self::CreateState { .. } => "createState",
            Self::RemoveState { .. } => "removeState",
            Self::StateUpdate { .. } => "stateUpdate",
            Self::ChoiceUpdate { .. } => "choiceUpdate",
            Self::SettingUpdate { .. } => "settingUpdate",
            Self::ShowNotification { .. } => "showNotification",
            Self::ConnectorUpdate { .. } => "connectorUpdate",
            Self::UpdateActionData { .. } => "updateActionData",
        }
    }

    /// Serialises the message as one wire line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialisation fails.
    pub fn encode_line(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_line(self)
    }
}

/// Serialises any value as compact JSON followed by `\n`.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialisation fails.
pub fn encode_line<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut line =
        serde_json::to_vec(value).map_err(|source| ProtocolError::Encode { source })?;
    line.push(b'\n');
    Ok(line)
}
