// Application layer - live-path components and query use cases
pub mod alarm_aggregator;
pub mod history_repository;
pub mod history_service;
pub mod prediction_service;
pub mod resampler;
pub mod telemetry_buffer;
