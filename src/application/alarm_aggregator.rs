// Alarm aggregator - one ordered list from device and backend alarms
use crate::domain::alarm::DeviceAlarm;
use crate::domain::telemetry::{DeviceDataMessage, TelemetrySample};

#[derive(Debug, Clone, Default)]
pub struct AlarmAggregator {
    active: Vec<DeviceAlarm>,
}

impl AlarmAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device alarms first, in sample order, then the pushed alarms untouched.
    ///
    /// No de-duplication across the two sources: the same condition can be
    /// flagged by the controller and by a backend threshold at once.
    pub fn merge(sample: &TelemetrySample, pushed: &[DeviceAlarm]) -> Vec<DeviceAlarm> {
        let embedded = sample.embedded_alarms();
        let mut merged = Vec::with_capacity(embedded.len() + pushed.len());
        merged.extend(
            embedded
                .iter()
                .map(|message| DeviceAlarm::from_device(&sample.device_id, message, sample.timestamp)),
        );
        merged.extend(pushed.iter().cloned());
        merged
    }

    /// Replaces the active list with the alarms of `message`.
    pub fn apply(&mut self, message: &DeviceDataMessage) -> &[DeviceAlarm] {
        self.active = Self::merge(&message.telemetry, &message.backend_alarms);
        &self.active
    }

    pub fn active(&self) -> &[DeviceAlarm] {
        &self.active
    }

    pub fn count(&self) -> usize {
        self.active.len()
    }

    pub fn headline(&self) -> Option<&DeviceAlarm> {
        self.active.first()
    }

    pub fn has_critical(&self) -> bool {
        self.active.iter().any(DeviceAlarm::is_critical)
    }

    pub fn summary(&self) -> String {
        match self.active.len() {
            0 => "No active alerts".to_string(),
            1 => "1 active alert".to_string(),
            n => format!("{} active alerts", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alarm::{AlarmSource, Severity};
    use chrono::NaiveDate;

    fn sample_with(alarms: &[&str]) -> TelemetrySample {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut sample = TelemetrySample::new("GEN-001", ts);
        sample.device_alarms = Some(alarms.iter().map(|a| a.to_string()).collect());
        sample
    }

    fn backend_alarm(message: &str) -> DeviceAlarm {
        DeviceAlarm {
            device_id: "GEN-001".to_string(),
            parameter: Some("OIL_TEMPERATURE".to_string()),
            message: message.to_string(),
            severity: Severity::Critical,
            value: Some(121.0),
            timestamp: None,
            source: AlarmSource::Backend,
        }
    }

    #[test]
    fn test_merge_order() {
        let pushed = vec![backend_alarm("High temp")];
        let merged = AlarmAggregator::merge(&sample_with(&["Low oil"]), &pushed);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].message, "Low oil");
        assert_eq!(merged[0].severity, Severity::Warning);
        assert_eq!(merged[0].parameter, None);
        assert_eq!(merged[0].value, None);
        assert_eq!(merged[0].source, AlarmSource::Device);
        assert_eq!(merged[1], pushed[0]);
    }

    #[test]
    fn test_no_dedup_across_sources() {
        let pushed = vec![backend_alarm("Low oil")];
        let merged = AlarmAggregator::merge(&sample_with(&["Low oil"]), &pushed);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_apply_tracks_headline_and_summary() {
        let mut aggregator = AlarmAggregator::new();
        assert_eq!(aggregator.summary(), "No active alerts");
        assert!(aggregator.headline().is_none());

        let message = DeviceDataMessage {
            telemetry: sample_with(&["Fuel low", "Battery weak"]),
            backend_alarms: vec![backend_alarm("High temp")],
        };
        aggregator.apply(&message);

        assert_eq!(aggregator.count(), 3);
        assert_eq!(aggregator.summary(), "3 active alerts");
        assert_eq!(aggregator.headline().unwrap().message, "Fuel low");
        assert!(aggregator.has_critical());

        let cleared = DeviceDataMessage {
            telemetry: sample_with(&[]),
            backend_alarms: vec![],
        };
        aggregator.apply(&cleared);
        assert_eq!(aggregator.count(), 0);
    }
}
