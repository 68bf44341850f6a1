// Device dashboard view - owns the live state of one mounted device page
use crate::application::alarm_aggregator::AlarmAggregator;
use crate::application::telemetry_buffer::{DerivedMetrics, TelemetryBuffer};
use crate::domain::alarm::DeviceAlarm;
use crate::domain::gauge::{GaugeReading, GaugeRenderer};
use crate::domain::telemetry::{DeviceDataMessage, TelemetrySample};
use crate::infrastructure::config::DashboardSettings;
use crate::infrastructure::connection::{ConnectionHandle, ConnectionManager};
use crate::infrastructure::subscription::Subscription;
use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::watch;

/// Everything a render pass needs, copied out of the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub device_id: String,
    pub connected: bool,
    pub status_label: &'static str,
    pub latest: Option<TelemetrySample>,
    pub metrics: Option<DerivedMetrics>,
    pub alarms: Vec<DeviceAlarm>,
    pub headline: Option<String>,
    pub alert_summary: String,
    pub rpm_gauge: Option<GaugeReading>,
    pub emergency_stop: bool,
}

/// Live state for one device page.
///
/// The view owns its connection, buffer and alarm list; nothing is shared
/// with other views. Dropping it tears everything down.
pub struct DeviceView {
    device_id: String,
    connection: ConnectionHandle,
    subscription: Option<Subscription>,
    buffer: TelemetryBuffer,
    alarms: AlarmAggregator,
    gauge: GaugeRenderer,
}

impl DeviceView {
    pub fn mount(manager: &ConnectionManager, device_id: &str, settings: &DashboardSettings) -> Self {
        let connection = manager.open();
        let subscription = connection.subscribe(device_id);
        tracing::info!("Mounted dashboard for {}", device_id);

        Self {
            device_id: device_id.to_string(),
            connection,
            subscription: Some(subscription),
            buffer: TelemetryBuffer::new(settings.window_capacity),
            alarms: AlarmAggregator::new(),
            gauge: GaugeRenderer::new(settings.rpm_gauge_max),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Waits for the next message and applies it.
    /// Returns false once the view has been torn down or the connection closed.
    pub async fn next_update(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.recv().await {
            Some(message) => {
                self.apply(message);
                true
            }
            None => false,
        }
    }

    /// Buffer and alarm list are updated from the same message in one step.
    pub fn apply(&mut self, message: DeviceDataMessage) {
        self.alarms.apply(&message);
        self.buffer.push(message.telemetry);
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn status(&self) -> watch::Receiver<bool> {
        self.connection.status()
    }

    pub fn buffer(&self) -> &TelemetryBuffer {
        &self.buffer
    }

    pub fn alarms(&self) -> &AlarmAggregator {
        &self.alarms
    }

    /// RPM across the live window for the trend chart.
    pub fn rpm_trend(&self) -> Vec<(NaiveDateTime, f64)> {
        self.buffer.series(|sample| sample.rpm)
    }

    /// Offline views keep showing the last buffered state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let connected = self.is_connected();
        let latest = self.buffer.latest().cloned();
        let rpm_gauge = latest
            .as_ref()
            .and_then(|sample| sample.rpm)
            .map(|rpm| self.gauge.map(rpm));
        let emergency_stop = latest
            .as_ref()
            .is_some_and(TelemetrySample::is_emergency_stopped);

        DashboardSnapshot {
            device_id: self.device_id.clone(),
            connected,
            status_label: if connected { "Online" } else { "Offline" },
            latest,
            metrics: self.buffer.metrics(),
            alarms: self.alarms.active().to_vec(),
            headline: self.alarms.headline().map(|alarm| alarm.message.clone()),
            alert_summary: self.alarms.summary(),
            rpm_gauge,
            emergency_stop,
        }
    }

    /// Unsubscribes and closes the connection. Safe to call more than once.
    pub fn teardown(&mut self) {
        let Some(mut subscription) = self.subscription.take() else {
            return;
        };
        subscription.unsubscribe();
        self.connection.close();
        tracing::info!("Unmounted dashboard for {}", self.device_id);
    }
}

impl Drop for DeviceView {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gauge::ColorBand;
    use crate::infrastructure::connection::ConnectionOptions;
    use crate::infrastructure::stomp::Command;
    use crate::infrastructure::transport::memory::{MemoryConnector, ServerSide};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    const TOPIC: &str = "/topic/device/GEN-001";

    const FULL: &str = r#"{
        "telemetry": {
            "deviceId": "GEN-001",
            "timestamp": "2024-05-01T10:00:00",
            "RPM": 2500,
            "Generator_P_L1": 10.0,
            "Generator_P_L3": 12.5,
            "Generator_Voltage_L1_N": 229.0,
            "Generator_Voltage_L2_N": 231.0,
            "E_STOP": false,
            "device_alarms": ["Low oil"]
        },
        "backendAlarms": [
            {"deviceId": "GEN-001", "parameter": "Oil_Temperature", "message": "High temp", "severity": "CRITICAL", "value": 121.0}
        ]
    }"#;

    fn rpm_only(rpm: u32) -> String {
        format!(
            r#"{{"telemetry": {{"deviceId": "GEN-001", "timestamp": "2024-05-01T10:00:0{}", "RPM": {}}}}}"#,
            rpm % 10,
            rpm
        )
    }

    fn setup() -> (ConnectionManager, mpsc::UnboundedReceiver<ServerSide>) {
        let (connector, sessions) = MemoryConnector::new();
        let manager = ConnectionManager::new(Arc::new(connector), ConnectionOptions::new("gateway"));
        (manager, sessions)
    }

    async fn connect(view: &DeviceView, sessions: &mut mpsc::UnboundedReceiver<ServerSide>) -> (ServerSide, String) {
        let mut server = sessions.recv().await.unwrap();
        server.accept("0,0").await;
        let subscribe = server.expect_frame(Command::Subscribe).await;
        assert_eq!(subscribe.get("destination"), Some(TOPIC));
        view.status().wait_for(|c| *c).await.unwrap();
        let id = subscribe.get("id").unwrap().to_string();
        (server, id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_update_feeds_every_widget() {
        let (manager, mut sessions) = setup();
        let mut view = DeviceView::mount(&manager, "GEN-001", &DashboardSettings::default());
        let (server, id) = connect(&view, &mut sessions).await;

        server.publish(&id, TOPIC, FULL);
        assert!(view.next_update().await);

        let snapshot = view.snapshot();
        assert!(snapshot.connected);
        assert_eq!(snapshot.status_label, "Online");
        assert!(!snapshot.emergency_stop);

        let metrics = snapshot.metrics.unwrap();
        assert_eq!(metrics.total_active_power, 22.5);
        assert_eq!(metrics.mean_voltage_ln, Some(230.0));

        assert_eq!(snapshot.alert_summary, "2 active alerts");
        assert_eq!(snapshot.headline.as_deref(), Some("Low oil"));
        assert_eq!(snapshot.alarms[1].message, "High temp");

        let gauge = snapshot.rpm_gauge.unwrap();
        assert_eq!(gauge.band, ColorBand::Danger);
        assert_eq!(gauge.value, 2500.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_bounded_and_in_receipt_order() {
        let (manager, mut sessions) = setup();
        let settings = DashboardSettings {
            window_capacity: 3,
            ..Default::default()
        };
        let mut view = DeviceView::mount(&manager, "GEN-001", &settings);
        let (server, id) = connect(&view, &mut sessions).await;

        for rpm in [1501, 1502, 1503, 1504, 1505] {
            server.publish(&id, TOPIC, &rpm_only(rpm));
            assert!(view.next_update().await);
        }

        let rpms: Vec<f64> = view.rpm_trend().into_iter().map(|(_, rpm)| rpm).collect();
        assert_eq!(rpms, vec![1503.0, 1504.0, 1505.0]);
        assert_eq!(view.snapshot().alert_summary, "No active alerts");
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_keeps_last_state() {
        let (manager, mut sessions) = setup();
        let mut view = DeviceView::mount(&manager, "GEN-001", &DashboardSettings::default());
        let (server, id) = connect(&view, &mut sessions).await;

        server.publish(&id, TOPIC, &rpm_only(1800));
        assert!(view.next_update().await);

        drop(server);
        view.status().wait_for(|c| !*c).await.unwrap();

        let snapshot = view.snapshot();
        assert_eq!(snapshot.status_label, "Offline");
        assert_eq!(snapshot.latest.unwrap().rpm, Some(1800.0));
        assert_eq!(snapshot.rpm_gauge.unwrap().band, ColorBand::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_updates_and_releases_connection() {
        let (manager, mut sessions) = setup();
        let mut view = DeviceView::mount(&manager, "GEN-001", &DashboardSettings::default());
        let (mut server, id) = connect(&view, &mut sessions).await;

        server.publish(&id, TOPIC, &rpm_only(1500));
        view.teardown();
        view.teardown();

        assert!(!view.next_update().await);
        assert!(!view.is_connected());
        assert!(view.buffer().is_empty());

        let mut saw_disconnect = false;
        while let Some(frame) = server.next_frame().await {
            saw_disconnect |= frame.command == Command::Disconnect;
        }
        assert!(saw_disconnect);
    }
}
