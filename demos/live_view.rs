// Live view demo - mounts one device dashboard and logs every render pass
//
//   cargo run --example live_view -- GEN-001
use chrono::Utc;
use genset_telemetry::application::history_service::HistoryService;
use genset_telemetry::application::prediction_service::PredictionService;
use genset_telemetry::infrastructure::config::load_settings;
use genset_telemetry::infrastructure::http_api::HttpApiClient;
use genset_telemetry::infrastructure::transport::WebSocketConnector;
use genset_telemetry::{ConnectionManager, ConnectionOptions, DeviceView, Sufficiency, TimeSeriesResampler};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let device_id = std::env::args().nth(1).unwrap_or_else(|| "GEN-001".to_string());
    let settings = load_settings()?;

    // History and predictions are independent of the live path
    let api = Arc::new(HttpApiClient::new(settings.api.base_url.clone()));
    let history = HistoryService::new(
        api.clone(),
        TimeSeriesResampler::new(settings.dashboard.resample_interval_ms),
    );
    let predictions = PredictionService::new(api);

    match history.rpm_chart(&device_id, Utc::now().date_naive()).await {
        Ok(Sufficiency::Ready(points)) => tracing::info!("RPM chart: {} points", points.len()),
        Ok(Sufficiency::NotEnoughData { reason }) => tracing::info!("RPM chart: {}", reason),
        Err(e) => tracing::warn!("RPM chart: {}", e.banner()),
    }
    match predictions.summary(&device_id).await {
        Ok(summary) => tracing::info!("Predictions: {:?}", summary),
        Err(e) => tracing::warn!("Predictions: {}", e.banner()),
    }

    let connector = Arc::new(WebSocketConnector::new(settings.stream.url.clone()));
    let manager = ConnectionManager::new(connector, ConnectionOptions::from(&settings.stream));
    let mut view = DeviceView::mount(&manager, &device_id, &settings.dashboard);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            updated = view.next_update() => {
                if !updated {
                    break;
                }
                let snapshot = view.snapshot();
                tracing::info!(
                    "[{}] rpm={} power={:.1}kW alerts={} {}",
                    snapshot.status_label,
                    snapshot
                        .rpm_gauge
                        .map(|gauge| gauge.label(0))
                        .unwrap_or_else(|| "-".to_string()),
                    snapshot.metrics.map(|m| m.total_active_power).unwrap_or_default(),
                    snapshot.alert_summary,
                    snapshot.headline.unwrap_or_default(),
                );
            }
        }
    }

    view.teardown();
    Ok(())
}
