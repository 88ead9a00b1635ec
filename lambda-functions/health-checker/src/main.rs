use anyhow::Context as _;
use health_checker::{
    CloudWatchMetrics, Config, EventBridgeScheduleSource, HealthCheckService, MySqlAuditStore,
    Request, Response, SecretProvider, SecretsManagerProvider, SnsNotifier,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{info, Instrument};

async fn function_handler(
    service: &HealthCheckService,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    let today = chrono::Utc::now().date_naive();
    let span = tracing::info_span!(
        "health_check",
        request_id = %event.context.request_id,
        date = %HealthCheckService::prior_day(today),
    );

    async move {
        info!("Starting health check, {} trigger records", event.payload.records.len());
        let response = service.run_health_check(today).await?;
        info!("{}", response.body);
        Ok(response)
    }
    .instrument(span)
    .await
}

/// Resolve configuration, credentials and clients once per cold start.
async fn bootstrap() -> anyhow::Result<HealthCheckService> {
    let config = Config::from_env().context("loading configuration")?;
    let sdk_config = aws_config::load_from_env().await;

    let credentials = SecretsManagerProvider::new(&sdk_config)
        .fetch_db_credentials(&config.database_secret)
        .await
        .with_context(|| format!("fetching secret {}", config.database_secret))?;

    let store = MySqlAuditStore::connect(&credentials, config.db_pool_size)
        .await
        .context("connecting to audit database")?;

    let notifier = SnsNotifier::new(&sdk_config, config.alert_topic_arn.clone());

    let mut service = HealthCheckService::new(Box::new(store), Box::new(notifier), config.clone());
    if config.publish_metrics {
        service = service.with_metrics(Box::new(CloudWatchMetrics::new(
            &sdk_config,
            config.metrics_namespace.clone(),
        )));
    }
    if config.schedule_check {
        service = service.with_schedule_source(Box::new(EventBridgeScheduleSource::new(&sdk_config)));
    }

    Ok(service)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let service = bootstrap().await?;
    let service = &service;

    run(service_fn(move |event: LambdaEvent<Request>| async move {
        function_handler(service, event).await
    }))
    .await
}
