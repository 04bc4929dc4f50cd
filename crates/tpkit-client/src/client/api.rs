//! Convenience methods that validate arguments and build host messages.

use std::collections::HashMap;

use serde_json::Value;
use tpkit_protocol::{ActionDataBounds, NotificationOption, OutboundMessage};

use super::Client;
use crate::error::ClientError;

const CONNECTOR_PREFIX: &str = "pc";
const CONNECTOR_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

/// A state to declare with [`Client::create_state_many`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDefinition {
    /// State identifier.
    pub id: String,
    /// Label shown in the host UI.
    pub description: String,
    /// Initial value.
    pub value: String,
}

impl StateDefinition {
    /// Builds a definition.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            value: value.into(),
        }
    }
}

fn require(operation: &'static str, name: &str, value: &str) -> Result<(), ClientError> {
    if value.is_empty() {
        return Err(ClientError::invalid_argument(
            operation,
            format!("{name} must not be empty"),
        ));
    }
    Ok(())
}

impl Client {
    /// Declares a state at runtime, or updates it if it already exists.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty id or description, and
    /// any error from [`Client::send`].
    pub fn create_state(&self, id: &str, description: &str, value: &str) -> Result<(), ClientError> {
        require("create_state", "state id", id)?;
        require("create_state", "description", description)?;
        let mut states = self.shared.states();
        if states.contains_key(id) {
            return self.update_cached_state(&mut states, id, value);
        }
        self.shared.send(&OutboundMessage::CreateState {
            id: id.to_owned(),
            desc: description.to_owned(),
            default_value: value.to_owned(),
        })?;
        states.insert(id.to_owned(), value.to_owned());
        Ok(())
    }

    /// Declares several states; stops at the first failure.
    ///
    /// # Errors
    ///
    /// The first error returned by [`Client::create_state`].
    pub fn create_state_many<I>(&self, states: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = StateDefinition>,
    {
        states.into_iter().try_for_each(|state| {
            self.create_state(&state.id, &state.description, &state.value)
        })
    }

    /// Removes a state created at runtime.
    ///
    /// With `validate_exists`, an id this client never created is an error;
    /// without it, such ids are ignored.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnknownState`] as described above, and any error from
    /// [`Client::send`].
    pub fn remove_state(&self, id: &str, validate_exists: bool) -> Result<(), ClientError> {
        let mut states = self.shared.states();
        if !id.is_empty() && states.contains_key(id) {
            self.shared.send(&OutboundMessage::RemoveState { id: id.to_owned() })?;
            states.remove(id);
            return Ok(());
        }
        if validate_exists {
            return Err(ClientError::UnknownState { id: id.to_owned() });
        }
        Ok(())
    }

    /// Removes several states without validating that they exist.
    ///
    /// # Errors
    ///
    /// The first error returned by [`Client::send`].
    pub fn remove_state_many<I, S>(&self, ids: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .try_for_each(|id| self.remove_state(id.as_ref(), false))
    }

    /// Sets a state value; nothing is sent if the cached value is equal.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty id, and any error from
    /// [`Client::send`].
    pub fn state_update(&self, id: &str, value: &str) -> Result<(), ClientError> {
        require("state_update", "state id", id)?;
        let mut states = self.shared.states();
        self.update_cached_state(&mut states, id, value)
    }

    /// Sets several state values; stops at the first failure.
    ///
    /// # Errors
    ///
    /// The first error returned by [`Client::state_update`].
    pub fn state_update_many<I, K, V>(&self, updates: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        updates
            .into_iter()
            .try_for_each(|(id, value)| self.state_update(id.as_ref(), value.as_ref()))
    }

    /// Replaces the values of a choice list everywhere it is shown.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty id, and any error from
    /// [`Client::send`].
    pub fn choice_update<I, S>(&self, id: &str, values: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        require("choice_update", "choice id", id)?;
        self.shared.send(&OutboundMessage::ChoiceUpdate {
            id: id.to_owned(),
            instance_id: None,
            value: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Replaces the values of a choice list on one button instance.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty id or instance id, and
    /// any error from [`Client::send`].
    pub fn choice_update_specific<I, S>(
        &self,
        id: &str,
        values: I,
        instance_id: &str,
    ) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        require("choice_update_specific", "choice id", id)?;
        require("choice_update_specific", "instance id", instance_id)?;
        self.shared.send(&OutboundMessage::ChoiceUpdate {
            id: id.to_owned(),
            instance_id: Some(instance_id.to_owned()),
            value: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Changes a plugin setting; nothing is sent if the cached value is
    /// equal. The cache also tracks values reported by the host.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty name, and any error from
    /// [`Client::send`].
    pub fn setting_update(&self, name: &str, value: impl Into<Value>) -> Result<(), ClientError> {
        require("setting_update", "setting name", name)?;
        let value = value.into();
        let mut settings = self.shared.settings();
        if settings.get(name) == Some(&value) {
            return Ok(());
        }
        self.shared.send(&OutboundMessage::SettingUpdate {
            name: name.to_owned(),
            value: value.clone(),
        })?;
        settings.insert(name.to_owned(), value);
        Ok(())
    }

    /// Shows a host notification with option buttons.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] when the id, title, or message is
    /// empty, when no option is given, or when an option lacks an id or title;
    /// and any error from [`Client::send`].
    pub fn show_notification(
        &self,
        notification_id: &str,
        title: &str,
        message: &str,
        options: Vec<NotificationOption>,
    ) -> Result<(), ClientError> {
        const OPERATION: &str = "show_notification";
        require(OPERATION, "notification id", notification_id)?;
        require(OPERATION, "title", title)?;
        require(OPERATION, "message", message)?;
        if options.is_empty() {
            return Err(ClientError::invalid_argument(
                OPERATION,
                "at least one option is required",
            ));
        }
        if options
            .iter()
            .any(|option| option.id.is_empty() || option.title.is_empty())
        {
            return Err(ClientError::invalid_argument(
                OPERATION,
                "all options require an id and a title",
            ));
        }
        self.shared.send(&OutboundMessage::ShowNotification {
            notification_id: notification_id.to_owned(),
            title: title.to_owned(),
            msg: message.to_owned(),
            options,
        })
    }

    /// Moves a connector slider to `value` (0 to 100).
    ///
    /// `connector_id` is the part after the plugin prefix, optionally with
    /// `|name=value` data selectors; the `pc_<pluginId>_` prefix is added.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty id or an out-of-range
    /// value, and any error from [`Client::send`].
    pub fn connector_update(&self, connector_id: &str, value: i64) -> Result<(), ClientError> {
        require("connector_update", "connector id", connector_id)?;
        if !CONNECTOR_RANGE.contains(&value) {
            return Err(ClientError::invalid_argument(
                "connector_update",
                format!("value must be between 0 and 100, got {value}"),
            ));
        }
        self.shared.send(&OutboundMessage::ConnectorUpdate {
            connector_id: format!(
                "{CONNECTOR_PREFIX}_{}_{connector_id}_",
                self.plugin_id()
            ),
            value: value.to_string(),
        })
    }

    /// Changes the numeric bounds of an action data field on one button
    /// instance.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for empty ids or `min_value` above
    /// `max_value`, and any error from [`Client::send`].
    pub fn update_action_data(
        &self,
        instance_id: &str,
        data_id: &str,
        min_value: f64,
        max_value: f64,
    ) -> Result<(), ClientError> {
        require("update_action_data", "instance id", instance_id)?;
        require("update_action_data", "data id", data_id)?;
        if min_value > max_value {
            return Err(ClientError::invalid_argument(
                "update_action_data",
                format!("minimum {min_value} exceeds maximum {max_value}"),
            ));
        }
        self.shared.send(&OutboundMessage::UpdateActionData {
            instance_id: instance_id.to_owned(),
            data: ActionDataBounds::number(data_id, min_value, max_value),
        })
    }

    /// Whether a hold-capable action is currently pressed.
    #[must_use]
    pub fn is_action_being_held(&self, action_id: &str) -> bool {
        self.shared.held().contains(action_id)
    }

    /// Last value sent for a state.
    #[must_use]
    pub fn current_state(&self, id: &str) -> Option<String> {
        self.shared.states().get(id).cloned()
    }

    /// Last known value of a setting.
    #[must_use]
    pub fn current_setting(&self, name: &str) -> Option<Value> {
        self.shared.settings().get(name).cloned()
    }

    fn update_cached_state(
        &self,
        states: &mut HashMap<String, String>,
        id: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        if states.get(id).map(String::as_str) != Some(value) {
            self.shared.send(&OutboundMessage::StateUpdate {
                id: id.to_owned(),
                value: value.to_owned(),
            })?;
        }
        states.insert(id.to_owned(), value.to_owned());
        Ok(())
    }
}
