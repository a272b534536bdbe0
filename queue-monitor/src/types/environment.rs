//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack` and a local HIS stub)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            Self::Production | Self::Staging => None,
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Base URL of the HIS read-only REST facade
    ///
    /// # Panics
    ///
    /// Panics if `HIS_GATEWAY_URL` is not set in production or staging
    #[must_use]
    pub fn his_gateway_url(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("HIS_GATEWAY_URL").expect("HIS_GATEWAY_URL environment variable is not set")
            }
            Self::Development => env::var("HIS_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8100".to_string()),
        }
    }

    /// LINE channel access token
    ///
    /// # Panics
    ///
    /// Panics if `LINE_CHANNEL_ACCESS_TOKEN` is not set in production or
    /// staging
    #[must_use]
    pub fn line_channel_access_token(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("LINE_CHANNEL_ACCESS_TOKEN")
                .expect("LINE_CHANNEL_ACCESS_TOKEN environment variable is not set"),
            Self::Development => {
                env::var("LINE_CHANNEL_ACCESS_TOKEN").unwrap_or_else(|_| "dev-token".to_string())
            }
        }
    }

    /// Override for the LINE API endpoint (local stub in development)
    #[must_use]
    pub fn line_api_base_url(&self) -> Option<String> {
        env::var("LINE_API_BASE_URL").ok()
    }

    /// DynamoDB table for per-visit notification tracking
    #[must_use]
    pub fn tracking_table(&self) -> String {
        env::var("TRACKING_TABLE").unwrap_or_else(|_| "opd-queue-tracking".to_string())
    }

    /// DynamoDB table for slot-call dedup
    #[must_use]
    pub fn slot_calls_table(&self) -> String {
        env::var("SLOT_CALLS_TABLE").unwrap_or_else(|_| "opd-slot-calls".to_string())
    }

    /// DynamoDB table of LINE identity bindings
    #[must_use]
    pub fn identity_table(&self) -> String {
        env::var("IDENTITY_TABLE").unwrap_or_else(|_| "opd-line-identities".to_string())
    }

    /// GSI of the identity table keyed by citizen id
    #[must_use]
    pub fn identity_citizen_id_index(&self) -> String {
        env::var("IDENTITY_CITIZEN_ID_INDEX").unwrap_or_else(|_| "citizen-id-index".to_string())
    }

    /// Base polling interval
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        let secs = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        Duration::from_secs(secs)
    }

    /// Consecutive-failure count that triggers the long sleep
    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        env::var("FAILURE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5)
    }

    /// Fixed long sleep applied once the failure threshold is reached
    #[must_use]
    pub fn long_sleep(&self) -> Duration {
        let secs = env::var("LONG_SLEEP_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);
        Duration::from_secs(secs)
    }
}
