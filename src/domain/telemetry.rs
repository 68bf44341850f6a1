// Telemetry domain models - one decoded push message per device tick
use crate::domain::alarm::DeviceAlarm;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One sample pushed by a generator controller.
///
/// Every channel is optional: an absent field means the device did not
/// report it this tick, which is not the same as a zero reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: NaiveDateTime,

    #[serde(rename = "RPM")]
    pub rpm: Option<f64>,

    #[serde(rename = "Generator_P_L1", alias = "power")]
    pub generator_p_l1: Option<f64>,
    #[serde(rename = "Generator_P_L2")]
    pub generator_p_l2: Option<f64>,
    #[serde(rename = "Generator_P_L3")]
    pub generator_p_l3: Option<f64>,

    #[serde(rename = "Generator_Q")]
    pub generator_q: Option<f64>,
    #[serde(rename = "Generator_Q_L1")]
    pub generator_q_l1: Option<f64>,
    #[serde(rename = "Generator_Q_L2")]
    pub generator_q_l2: Option<f64>,
    #[serde(rename = "Generator_Q_L3")]
    pub generator_q_l3: Option<f64>,

    #[serde(rename = "Generator_S")]
    pub generator_s: Option<f64>,
    #[serde(rename = "Generator_S_L1")]
    pub generator_s_l1: Option<f64>,
    #[serde(rename = "Generator_S_L2")]
    pub generator_s_l2: Option<f64>,
    #[serde(rename = "Generator_S_L3")]
    pub generator_s_l3: Option<f64>,

    #[serde(rename = "Generator_Power_Factor")]
    pub generator_power_factor: Option<f64>,
    #[serde(rename = "Generator_Frequency", alias = "frequency")]
    pub generator_frequency: Option<f64>,

    #[serde(rename = "Generator_Voltage_L1_N", alias = "voltage")]
    pub generator_voltage_l1_n: Option<f64>,
    #[serde(rename = "Generator_Voltage_L2_N")]
    pub generator_voltage_l2_n: Option<f64>,
    #[serde(rename = "Generator_Voltage_L3_N")]
    pub generator_voltage_l3_n: Option<f64>,

    #[serde(rename = "Generator_Voltage_L1_L2")]
    pub generator_voltage_l1_l2: Option<f64>,
    #[serde(rename = "Generator_Voltage_L2_L3")]
    pub generator_voltage_l2_l3: Option<f64>,
    #[serde(rename = "Generator_Voltage_L3_L1")]
    pub generator_voltage_l3_l1: Option<f64>,

    #[serde(rename = "Generator_Current_L1", alias = "current")]
    pub generator_current_l1: Option<f64>,
    #[serde(rename = "Generator_Current_L2")]
    pub generator_current_l2: Option<f64>,
    #[serde(rename = "Generator_Current_L3")]
    pub generator_current_l3: Option<f64>,

    #[serde(rename = "Earth_Fault_Current")]
    pub earth_fault_current: Option<f64>,

    #[serde(rename = "Mains_Bus_Frequency")]
    pub mains_bus_frequency: Option<f64>,
    #[serde(rename = "Mains_Bus_Voltage_L1_N")]
    pub mains_bus_voltage_l1_n: Option<f64>,
    #[serde(rename = "Mains_Bus_Voltage_L2_N")]
    pub mains_bus_voltage_l2_n: Option<f64>,
    #[serde(rename = "Mains_Bus_Voltage_L3_N")]
    pub mains_bus_voltage_l3_n: Option<f64>,
    #[serde(rename = "Mains_Bus_Voltage_L1_L2")]
    pub mains_bus_voltage_l1_l2: Option<f64>,
    #[serde(rename = "Mains_Bus_Voltage_L2_L3")]
    pub mains_bus_voltage_l2_l3: Option<f64>,
    #[serde(rename = "Mains_Bus_Voltage_L3_L1")]
    pub mains_bus_voltage_l3_l1: Option<f64>,
    #[serde(rename = "Mains_L1_Current")]
    pub mains_l1_current: Option<f64>,
    #[serde(rename = "Mains_Import_P")]
    pub mains_import_p: Option<f64>,
    #[serde(rename = "Mains_Import_Q")]
    pub mains_import_q: Option<f64>,
    #[serde(rename = "Mains_PF")]
    pub mains_pf: Option<f64>,

    #[serde(rename = "Max_Vector_Shift")]
    pub max_vector_shift: Option<f64>,
    #[serde(rename = "ROCOF")]
    pub rocof: Option<f64>,
    #[serde(rename = "Max_ROCOF")]
    pub max_rocof: Option<f64>,

    #[serde(rename = "Load_P")]
    pub load_p: Option<f64>,
    #[serde(rename = "Load_Q")]
    pub load_q: Option<f64>,
    #[serde(rename = "Load_PF")]
    pub load_pf: Option<f64>,

    #[serde(rename = "Battery_Volts")]
    pub battery_volts: Option<f64>,
    #[serde(rename = "D_Plus")]
    pub d_plus: Option<f64>,

    #[serde(rename = "Oil_Pressure")]
    pub oil_pressure: Option<f64>,
    #[serde(rename = "Oil_Temperature", alias = "temperature")]
    pub oil_temperature: Option<f64>,

    #[serde(rename = "Fuel_Level")]
    pub fuel_level: Option<f64>,

    #[serde(rename = "E_STOP")]
    pub e_stop: Option<bool>,

    #[serde(rename = "Alarm")]
    pub alarm: Option<String>,

    #[serde(rename = "device_alarms")]
    pub device_alarms: Option<Vec<String>>,
}

impl TelemetrySample {
    pub fn new(device_id: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            ..Default::default()
        }
    }

    /// Alarm strings raised by the controller itself.
    pub fn embedded_alarms(&self) -> &[String] {
        self.device_alarms.as_deref().unwrap_or(&[])
    }

    pub fn phase_active_power(&self) -> [Option<f64>; 3] {
        [self.generator_p_l1, self.generator_p_l2, self.generator_p_l3]
    }

    pub fn phase_reactive_power(&self) -> [Option<f64>; 3] {
        [self.generator_q_l1, self.generator_q_l2, self.generator_q_l3]
    }

    pub fn phase_voltage_ln(&self) -> [Option<f64>; 3] {
        [
            self.generator_voltage_l1_n,
            self.generator_voltage_l2_n,
            self.generator_voltage_l3_n,
        ]
    }

    pub fn phase_voltage_ll(&self) -> [Option<f64>; 3] {
        [
            self.generator_voltage_l1_l2,
            self.generator_voltage_l2_l3,
            self.generator_voltage_l3_l1,
        ]
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.e_stop.unwrap_or(false)
    }
}

/// Wire envelope published on a device topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDataMessage {
    pub telemetry: TelemetrySample,
    #[serde(rename = "backendAlarms", default)]
    pub backend_alarms: Vec<DeviceAlarm>,
}

impl DeviceDataMessage {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Parses a zone-less ISO-8601 local time, or an RFC 3339 time normalised to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    raw.parse::<NaiveDateTime>().ok()
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{}`", raw)))
}

pub(crate) fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_timestamp(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{}`", raw)))
        })
        .transpose()
}
