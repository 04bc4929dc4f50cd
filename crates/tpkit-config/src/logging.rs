use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output formats understood by the plugin telemetry subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    Json,
    /// Single-line human-readable output. Plugin stderr usually ends up in
    /// the host's log folder, so this is the default.
    #[default]
    Compact,
    /// Multi-line output with source locations, handy while developing.
    Pretty,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;
