// Live generator telemetry - stream processing and history reconstruction for dashboards
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::alarm_aggregator::AlarmAggregator;
pub use application::resampler::{resample, FillPolicy, TimeSeriesResampler};
pub use application::telemetry_buffer::{DerivedMetrics, RollingWindow, TelemetryBuffer};
pub use domain::gauge::{ColorBand, GaugeReading, GaugeRenderer};
pub use domain::sufficiency::Sufficiency;
pub use error::{DecodeError, QueryError, TransportError};
pub use infrastructure::connection::{ConnectionHandle, ConnectionManager, ConnectionOptions};
pub use infrastructure::subscription::{Subscription, SubscriptionRouter};
pub use presentation::device_view::{DashboardSnapshot, DeviceView};
