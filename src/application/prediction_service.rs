// Prediction service - fetches backend predictions for display
use crate::application::history_repository::PredictionRepository;
use crate::domain::prediction::{PredictionSummary, RuntimeOutlook};
use crate::error::QueryError;
use std::sync::Arc;

#[derive(Clone)]
pub struct PredictionService {
    repository: Arc<dyn PredictionRepository>,
}

impl PredictionService {
    pub fn new(repository: Arc<dyn PredictionRepository>) -> Self {
        Self { repository }
    }

    pub async fn summary(&self, device_id: &str) -> Result<PredictionSummary, QueryError> {
        let predictions = self
            .repository
            .model_predictions(device_id)
            .await
            .inspect_err(|e| tracing::warn!("Predictions for {} failed: {}", device_id, e))?;
        Ok(predictions.summarize())
    }

    pub async fn outlook(&self, device_id: &str) -> Result<RuntimeOutlook, QueryError> {
        self.repository
            .runtime_outlook(device_id)
            .await
            .inspect_err(|e| tracing::warn!("Runtime outlook for {} failed: {}", device_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::{ModelPredictions, RuntimePrediction};
    use async_trait::async_trait;

    struct FakePredictions {
        predictions: ModelPredictions,
    }

    #[async_trait]
    impl PredictionRepository for FakePredictions {
        async fn runtime_outlook(&self, _device_id: &str) -> Result<RuntimeOutlook, QueryError> {
            Ok(RuntimeOutlook::default())
        }

        async fn model_predictions(&self, device_id: &str) -> Result<ModelPredictions, QueryError> {
            if device_id == "missing" {
                return Err(QueryError::Status {
                    url: "/api/ai/predictions/missing".to_string(),
                    status: 404,
                    body: String::new(),
                });
            }
            Ok(self.predictions.clone())
        }
    }

    fn service() -> PredictionService {
        PredictionService::new(Arc::new(FakePredictions {
            predictions: ModelPredictions {
                fuel_predictions: vec![RuntimePrediction {
                    timestamp: 10,
                    rule_based_runtime: Some(8.0),
                    ai_corrected_runtime: Some(10.0),
                    confidence: Some(0.7),
                }],
                ..Default::default()
            },
        }))
    }

    #[tokio::test]
    async fn test_summary() {
        let summary = service().summary("GEN-001").await.unwrap();
        let generator = summary.generator.ready().unwrap();
        assert_eq!(generator.predicted, 10.0);
        assert_eq!(generator.correction_factor, Some(1.25));
        assert!(!summary.battery.is_ready());
    }

    #[tokio::test]
    async fn test_summary_error() {
        let err = service().summary("missing").await.unwrap_err();
        assert_eq!(err.banner(), "Device not found");
    }

    #[tokio::test]
    async fn test_outlook_without_data() {
        let outlook = service().outlook("GEN-001").await.unwrap();
        assert_eq!(outlook.fuel().reason(), Some("No fuel data reported"));
    }
}
