use async_trait::async_trait;
use aws_sdk_cloudwatch::{
    types::{Dimension, MetricDatum, StandardUnit},
    Client as CloudWatchClient,
};
use tracing::{error, info};

use crate::error::{HealthCheckError, Result};
use crate::models::CheckResult;

#[async_trait]
pub trait MetricsPublisher: Send + Sync {
    async fn publish_check(&self, result: &CheckResult) -> Result<()>;
}

pub struct CloudWatchMetrics {
    client: CloudWatchClient,
    namespace: String,
}

impl CloudWatchMetrics {
    pub fn new(config: &aws_config::SdkConfig, namespace: impl Into<String>) -> Self {
        Self {
            client: CloudWatchClient::new(config),
            namespace: namespace.into(),
        }
    }

    fn build_metrics(result: &CheckResult) -> Vec<MetricDatum> {
        let timestamp = aws_sdk_cloudwatch::primitives::DateTime::from(std::time::SystemTime::now());
        let dimension = Dimension::builder()
            .name("FunctionName")
            .value(&result.function_name)
            .build();

        let mut metrics = Vec::new();

        // No rate exists for a day without runs
        if let Some(rate) = result.error_rate {
            metrics.push(
                MetricDatum::builder()
                    .metric_name("ErrorRate")
                    .dimensions(dimension.clone())
                    .value(rate)
                    .unit(StandardUnit::None)
                    .timestamp(timestamp.clone())
                    .build(),
            );
        }

        metrics.push(
            MetricDatum::builder()
                .metric_name("FailedInvocations")
                .dimensions(dimension)
                .value(result.failures as f64)
                .unit(StandardUnit::Count)
                .timestamp(timestamp)
                .build(),
        );

        metrics
    }
}

#[async_trait]
impl MetricsPublisher for CloudWatchMetrics {
    async fn publish_check(&self, result: &CheckResult) -> Result<()> {
        let metrics = Self::build_metrics(result);
        info!(
            "Publishing {} metrics to CloudWatch for {}",
            metrics.len(),
            result.function_name
        );

        match self
            .client
            .put_metric_data()
            .namespace(&self.namespace)
            .set_metric_data(Some(metrics))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to publish metrics: {}", e);
                Err(HealthCheckError::Metrics(e.to_string()))
            }
        }
    }
}
