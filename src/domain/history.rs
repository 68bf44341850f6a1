// History domain models - batches fetched over REST for charting
use crate::domain::telemetry::deserialize_timestamp;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl HistoryPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// Request body of the history query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub device_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub parameters: Vec<String>,
}

impl HistoryQuery {
    pub fn new(
        device_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            start_time,
            end_time,
            parameters,
        }
    }
}

/// One row of a history query: every requested parameter the device reported at that time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl HistoryRecord {
    /// Numeric value of a parameter; booleans chart as 1/0, anything else is skipped.
    pub fn value_of(&self, parameter: &str) -> Option<f64> {
        match self.parameters.get(parameter)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Raw RPM reading from the single-day endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpmReading {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub rpm: Option<f64>,
}

impl RpmReading {
    pub fn to_point(&self) -> Option<HistoryPoint> {
        self.rpm
            .map(|rpm| HistoryPoint::new(self.timestamp.and_utc().timestamp_millis(), rpm))
    }
}
