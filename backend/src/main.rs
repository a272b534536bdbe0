use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing_subscriber::{fmt, EnvFilter};

use push_gateway::LineMessaging;
use queue_backend::{queue_manager::QueueManager, server, types::Environment};
use queue_storage::kv::RedisKv;
use queue_storage::ticket::DynamoTicketStore;

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

    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));
    let ticket_store = Arc::new(DynamoTicketStore::new(
        dynamodb_client,
        environment.tickets_table(),
        environment.ticket_history_table(),
    ));

    let kv = Arc::new(RedisKv::connect(&environment.redis_url()).await?);

    let access_token = environment.line_channel_access_token();
    let push_channel = Arc::new(environment.line_api_base_url().map_or_else(
        || LineMessaging::new(access_token.clone()),
        |base| LineMessaging::with_base_url(access_token.clone(), base),
    ));

    let queue_manager = Arc::new(QueueManager::new(
        kv,
        ticket_store,
        push_channel,
        environment.per_person_minutes(),
    ));

    server::start(environment, queue_manager).await
}
