// History service - use cases for the history and RPM charts
use crate::application::history_repository::HistoryRepository;
use crate::application::resampler::TimeSeriesResampler;
use crate::domain::history::{HistoryPoint, HistoryQuery, HistoryRecord};
use crate::domain::sufficiency::Sufficiency;
use crate::error::QueryError;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct HistoryService {
    repository: Arc<dyn HistoryRepository>,
    resampler: TimeSeriesResampler,
}

impl HistoryService {
    pub fn new(repository: Arc<dyn HistoryRepository>, resampler: TimeSeriesResampler) -> Self {
        Self {
            repository,
            resampler,
        }
    }

    pub async fn query(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        parameters: Vec<String>,
    ) -> Result<Vec<HistoryRecord>, QueryError> {
        if start >= end {
            return Err(QueryError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        let query = HistoryQuery::new(device_id, start, end, parameters);
        let mut records = self.repository.query(&query).await.inspect_err(|e| {
            tracing::warn!("History query for {} failed: {}", device_id, e);
        })?;
        records.sort_by_key(|r| r.timestamp);

        tracing::debug!("Loaded {} history records for {}", records.len(), device_id);
        Ok(records)
    }

    /// Gap-filled RPM series for one day, ready for the line chart.
    pub async fn rpm_chart(
        &self,
        device_id: &str,
        date: NaiveDate,
    ) -> Result<Sufficiency<Vec<HistoryPoint>>, QueryError> {
        let points = self
            .repository
            .daily_rpm(device_id, date)
            .await
            .inspect_err(|e| {
                tracing::warn!("RPM history for {} on {} failed: {}", device_id, date, e);
            })?;

        if points.is_empty() {
            return Ok(Sufficiency::not_enough(format!(
                "No RPM data recorded on {}",
                date
            )));
        }

        Ok(Sufficiency::Ready(self.resampler.resample(points)))
    }

    pub async fn parameters(&self) -> Result<BTreeMap<String, String>, QueryError> {
        self.repository.parameters().await
    }

    /// One numeric parameter out of a record batch, time ordered.
    pub fn series(records: &[HistoryRecord], parameter: &str) -> Vec<HistoryPoint> {
        let mut points: Vec<HistoryPoint> = records
            .iter()
            .filter_map(|r| {
                r.value_of(parameter)
                    .map(|v| HistoryPoint::new(r.timestamp.and_utc().timestamp_millis(), v))
            })
            .collect();
        points.sort_by_key(|p| p.time_ms);
        points
    }
}
