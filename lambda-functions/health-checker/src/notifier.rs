use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{HealthCheckError, Result};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Alert {
    pub subject: String,
    pub message: String,
}

impl Alert {
    pub fn threshold_breach(
        function_name: &str,
        date: NaiveDate,
        error_rate: f64,
        threshold: f64,
    ) -> Self {
        Self {
            subject: subject_for(date),
            message: format!(
                "Error rate for {} on {} of {} exceeded acceptable threshold of {}",
                function_name, date, error_rate, threshold
            ),
        }
    }

    pub fn no_invocations(function_name: &str, date: NaiveDate) -> Self {
        Self {
            subject: subject_for(date),
            message: format!("No invocations of {} were recorded on {}", function_name, date),
        }
    }
}

fn subject_for(date: NaiveDate) -> String {
    format!("Health checker warning {}", date)
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, alert: &Alert) -> Result<()>;
}

/// Publishes alerts to an SNS topic. Fire and forget: no retry.
pub struct SnsNotifier {
    client: SnsClient,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(config: &aws_config::SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self {
            client: SnsClient::new(config),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, alert: &Alert) -> Result<()> {
        info!("Health warning causing publish to topic: {}", self.topic_arn);

        match self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(&alert.subject)
            .message(&alert.message)
            .send()
            .await
        {
            Ok(output) => {
                info!(
                    "Published alert {}",
                    output.message_id().unwrap_or("<no message id>")
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to publish to {}: {}", self.topic_arn, e);
                Err(HealthCheckError::Notification(e.to_string()))
            }
        }
    }
}
