// Prediction models - computed by the backend, only rendered here
use crate::domain::sufficiency::Sufficiency;
use crate::domain::telemetry::deserialize_optional_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Rule-based vs model-corrected generator runtime at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimePrediction {
    pub timestamp: i64,
    pub rule_based_runtime: Option<f64>,
    pub ai_corrected_runtime: Option<f64>,
    pub confidence: Option<f64>,
}

/// Rule-based vs model-corrected battery drain at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryPrediction {
    pub timestamp: i64,
    pub rule_based_drain: Option<f64>,
    pub ai_corrected_drain: Option<f64>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPredictions {
    #[serde(default)]
    pub fuel_predictions: Vec<RuntimePrediction>,
    #[serde(default)]
    pub battery_predictions: Vec<BatteryPrediction>,
    pub current_fuel_level: Option<f64>,
    pub current_battery_voltage: Option<f64>,
    pub current_load: Option<f64>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Generator,
    Battery,
}

/// Latest prediction for one subsystem.
///
/// `predicted` is hours of runtime for the generator and the drain rate for the battery.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsystemPrediction {
    pub subsystem: Subsystem,
    pub timestamp: i64,
    pub predicted: f64,
    pub confidence: f64,
    pub correction_factor: Option<f64>,
}

impl SubsystemPrediction {
    fn build(
        subsystem: Subsystem,
        timestamp: i64,
        rule_based: Option<f64>,
        corrected: Option<f64>,
        confidence: Option<f64>,
    ) -> Option<Self> {
        let predicted = corrected.or(rule_based)?;
        let correction_factor = match (rule_based, corrected) {
            (Some(rule), Some(corrected)) if rule > 0.0 => Some(corrected / rule),
            _ => None,
        };
        Some(Self {
            subsystem,
            timestamp,
            predicted,
            confidence: confidence.filter(|c| c.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0),
            correction_factor,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSummary {
    pub generator: Sufficiency<SubsystemPrediction>,
    pub battery: Sufficiency<SubsystemPrediction>,
}

impl ModelPredictions {
    pub fn summarize(&self) -> PredictionSummary {
        let generator = self
            .fuel_predictions
            .iter()
            .max_by_key(|p| p.timestamp)
            .and_then(|p| {
                SubsystemPrediction::build(
                    Subsystem::Generator,
                    p.timestamp,
                    p.rule_based_runtime,
                    p.ai_corrected_runtime,
                    p.confidence,
                )
            });
        let battery = self
            .battery_predictions
            .iter()
            .max_by_key(|p| p.timestamp)
            .and_then(|p| {
                SubsystemPrediction::build(
                    Subsystem::Battery,
                    p.timestamp,
                    p.rule_based_drain,
                    p.ai_corrected_drain,
                    p.confidence,
                )
            });

        PredictionSummary {
            generator: generator.map(Sufficiency::Ready).unwrap_or_else(|| {
                Sufficiency::not_enough("No generator runtime predictions yet")
            }),
            battery: battery
                .map(Sufficiency::Ready)
                .unwrap_or_else(|| Sufficiency::not_enough("No battery predictions yet")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlookPoint {
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    pub value: Option<f64>,
}

/// Remaining-runtime outlook for one consumable (fuel or battery charge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumableOutlook {
    #[serde(alias = "currentSoc")]
    pub current_level: Option<f64>,
    pub decline_rate: Option<f64>,
    pub predicted_runtime_hours: Option<f64>,
    pub predicted_runtime_minutes: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub estimated_empty_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub historical_data: Vec<OutlookPoint>,
    #[serde(default)]
    pub has_enough_data: bool,
    pub message: Option<String>,
}

impl ConsumableOutlook {
    pub fn into_sufficiency(self) -> Sufficiency<ConsumableOutlook> {
        if self.has_enough_data {
            Sufficiency::Ready(self)
        } else {
            let reason = self
                .message
                .unwrap_or_else(|| "Not enough data to predict yet".to_string());
            Sufficiency::not_enough(reason)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeOutlook {
    pub fuel_prediction: Option<ConsumableOutlook>,
    pub battery_prediction: Option<ConsumableOutlook>,
}

impl RuntimeOutlook {
    pub fn fuel(&self) -> Sufficiency<ConsumableOutlook> {
        self.fuel_prediction
            .clone()
            .map(ConsumableOutlook::into_sufficiency)
            .unwrap_or_else(|| Sufficiency::not_enough("No fuel data reported"))
    }

    pub fn battery(&self) -> Sufficiency<ConsumableOutlook> {
        self.battery_prediction
            .clone()
            .map(ConsumableOutlook::into_sufficiency)
            .unwrap_or_else(|| Sufficiency::not_enough("No battery data reported"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_picks_latest_and_computes_factor() {
        let predictions: ModelPredictions = serde_json::from_str(
            r#"{
                "fuelPredictions": [
                    {"timestamp": 2000, "ruleBasedRuntime": 10.0, "aiCorrectedRuntime": 9.0, "confidence": 0.82},
                    {"timestamp": 1000, "ruleBasedRuntime": 12.0, "aiCorrectedRuntime": 12.0, "confidence": 0.5}
                ],
                "batteryPredictions": [],
                "currentFuelLevel": 64.0,
                "lastUpdated": "2024-05-01T10:00:00"
            }"#,
        )
        .unwrap();

        let summary = predictions.summarize();
        let generator = summary.generator.ready().unwrap();
        assert_eq!(generator.subsystem, Subsystem::Generator);
        assert_eq!(generator.timestamp, 2000);
        assert_eq!(generator.predicted, 9.0);
        assert_eq!(generator.confidence, 0.82);
        assert_eq!(generator.correction_factor, Some(0.9));
        assert_eq!(
            summary.battery.reason(),
            Some("No battery predictions yet")
        );
    }

    #[test]
    fn test_confidence_is_clamped_and_factor_needs_positive_baseline() {
        let predictions = ModelPredictions {
            battery_predictions: vec![BatteryPrediction {
                timestamp: 5,
                rule_based_drain: Some(0.0),
                ai_corrected_drain: Some(1.4),
                confidence: Some(1.7),
            }],
            ..Default::default()
        };

        let battery = predictions.summarize().battery.ready().unwrap();
        assert_eq!(battery.predicted, 1.4);
        assert_eq!(battery.confidence, 1.0);
        assert_eq!(battery.correction_factor, None);
    }

    #[test]
    fn test_non_finite_confidence_is_zero() {
        let predictions = ModelPredictions {
            fuel_predictions: vec![RuntimePrediction {
                timestamp: 7,
                rule_based_runtime: Some(10.0),
                ai_corrected_runtime: None,
                confidence: Some(f64::NAN),
            }],
            ..Default::default()
        };

        let generator = predictions.summarize().generator.ready().unwrap();
        assert_eq!(generator.predicted, 10.0);
        assert_eq!(generator.confidence, 0.0);
    }

    #[test]
    fn test_outlook_without_enough_data() {
        let outlook: RuntimeOutlook = serde_json::from_str(
            r#"{
                "fuelPrediction": {
                    "currentLevel": 71.5,
                    "declineRate": 2.1,
                    "predictedRuntimeHours": 34.0,
                    "predictedRuntimeMinutes": 2040.0,
                    "estimatedEmptyTime": "2024-05-03T08:00:00",
                    "historicalData": [{"timestamp": "2024-05-01T08:00:00", "value": 73.0}],
                    "hasEnoughData": true
                },
                "batteryPrediction": {
                    "currentSoc": 88.0,
                    "hasEnoughData": false,
                    "message": "Battery is charging"
                }
            }"#,
        )
        .unwrap();

        let fuel = outlook.fuel().ready().unwrap();
        assert_eq!(fuel.current_level, Some(71.5));
        assert_eq!(fuel.historical_data.len(), 1);
        assert_eq!(outlook.battery().reason(), Some("Battery is charging"));
    }
}
