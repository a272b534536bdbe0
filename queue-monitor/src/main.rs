use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use push_gateway::LineMessaging;
use queue_monitor::health;
use queue_monitor::his::HisGateway;
use queue_monitor::monitor::{BackoffPolicy, QueueMonitor};
use queue_monitor::types::Environment;
use queue_storage::identity::DynamoIdentityStore;
use queue_storage::tracking::{DynamoSlotCallStore, DynamoTrackingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON format for staging/production log shipping, regular format for
    // development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    info!("Starting queue monitor in {:?} environment", environment);

    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));

    let tracker = Arc::new(DynamoTrackingStore::new(
        dynamodb_client.clone(),
        environment.tracking_table(),
    ));
    let slot_calls = Arc::new(DynamoSlotCallStore::new(
        dynamodb_client.clone(),
        environment.slot_calls_table(),
    ));
    let registry = Arc::new(DynamoIdentityStore::new(
        dynamodb_client,
        environment.identity_table(),
        environment.identity_citizen_id_index(),
    ));

    let source = Arc::new(HisGateway::new(environment.his_gateway_url()));

    let access_token = environment.line_channel_access_token();
    let push_channel = Arc::new(environment.line_api_base_url().map_or_else(
        || LineMessaging::new(access_token.clone()),
        |base| LineMessaging::with_base_url(access_token.clone(), base),
    ));

    let backoff = BackoffPolicy::new(
        environment.poll_interval(),
        environment.failure_threshold(),
        environment.long_sleep(),
    );

    let monitor = QueueMonitor::new(source, registry, tracker, slot_calls, push_channel, backoff);
    let shutdown_token = monitor.shutdown_token();

    // Start health check server
    let health_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_shutdown).await {
            error!("Health server error: {}", e);
        }
    });

    // Spawn signal handler
    let signal_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
                signal_shutdown.cancel();
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    monitor.start().await;

    info!("Queue monitor stopped");
    Ok(())
}
