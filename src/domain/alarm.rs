// Alarm domain model
use crate::domain::telemetry::deserialize_optional_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Critical,
}

/// Where an alarm came from. Not part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlarmSource {
    /// Raised by the controller and embedded in the telemetry sample.
    Device,
    /// Threshold breach detected server side and pushed alongside the sample.
    #[default]
    Backend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAlarm {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(default)]
    pub parameter: Option<String>,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(skip)]
    pub source: AlarmSource,
}

impl DeviceAlarm {
    /// Alarm synthesized from a controller alarm string.
    pub fn from_device(device_id: &str, message: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            device_id: device_id.to_string(),
            parameter: None,
            message: message.to_string(),
            severity: Severity::Warning,
            value: None,
            timestamp: Some(timestamp),
            source: AlarmSource::Device,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
