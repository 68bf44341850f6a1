// REST client for the history and prediction endpoints
use crate::application::history_repository::{HistoryRepository, PredictionRepository};
use crate::domain::history::{HistoryPoint, HistoryQuery, HistoryRecord, RpmReading};
use crate::domain::prediction::{ModelPredictions, RuntimeOutlook};
use crate::error::QueryError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: String,
    ) -> Result<T, QueryError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| QueryError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status { url, status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| QueryError::Decode { url, source })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, QueryError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        self.execute(self.client.get(&url), url).await
    }
}

#[async_trait]
impl HistoryRepository for HttpApiClient {
    async fn query(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, QueryError> {
        let url = self.url("/api/history/query");
        tracing::debug!(
            "POST {} for {} ({} parameters)",
            url,
            query.device_id,
            query.parameters.len()
        );
        self.execute(self.client.post(&url).json(query), url).await
    }

    async fn daily_rpm(
        &self,
        device_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<HistoryPoint>, QueryError> {
        let path = format!(
            "/api/history/rpm/{}?date={}",
            urlencoding::encode(device_id),
            date.format("%Y-%m-%d")
        );
        let readings: Vec<RpmReading> = self.get(&path).await?;
        let points: Vec<HistoryPoint> = readings.iter().filter_map(RpmReading::to_point).collect();

        tracing::debug!(
            "Got {} RPM readings ({} with values) for {} on {}",
            readings.len(),
            points.len(),
            device_id,
            date
        );
        Ok(points)
    }

    async fn parameters(&self) -> Result<BTreeMap<String, String>, QueryError> {
        self.get("/api/history/parameters").await
    }
}

#[async_trait]
impl PredictionRepository for HttpApiClient {
    async fn runtime_outlook(&self, device_id: &str) -> Result<RuntimeOutlook, QueryError> {
        let path = format!("/api/predictions/{}", urlencoding::encode(device_id));
        self.get(&path).await
    }

    async fn model_predictions(&self, device_id: &str) -> Result<ModelPredictions, QueryError> {
        let path = format!("/api/ai/predictions/{}", urlencoding::encode(device_id));
        self.get(&path).await
    }
}
