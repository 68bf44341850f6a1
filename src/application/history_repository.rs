// Repository traits for the REST collaborators
use crate::domain::history::{HistoryPoint, HistoryQuery, HistoryRecord};
use crate::domain::prediction::{ModelPredictions, RuntimeOutlook};
use crate::error::QueryError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Recorded samples in a time range, unordered
    async fn query(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, QueryError>;

    /// Raw RPM readings for one calendar day, unordered
    async fn daily_rpm(&self, device_id: &str, date: NaiveDate)
    -> Result<Vec<HistoryPoint>, QueryError>;

    /// Queryable parameter names mapped to display names
    async fn parameters(&self) -> Result<BTreeMap<String, String>, QueryError>;
}

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Fuel and battery outlook, each flagged when there is not enough history
    async fn runtime_outlook(&self, device_id: &str) -> Result<RuntimeOutlook, QueryError>;

    /// Rule-based vs model-corrected prediction series
    async fn model_predictions(&self, device_id: &str) -> Result<ModelPredictions, QueryError>;
}
