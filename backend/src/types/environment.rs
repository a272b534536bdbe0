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
    /// Development environment (uses `LocalStack` and local Redis)
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

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
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

    /// Redis connection URL
    ///
    /// # Panics
    ///
    /// Panics if `REDIS_URL` is not set in production or staging
    #[must_use]
    pub fn redis_url(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("REDIS_URL").expect("REDIS_URL environment variable is not set")
            }
            Self::Development => env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        }
    }

    /// DynamoDB table holding the current row per ticket
    #[must_use]
    pub fn tickets_table(&self) -> String {
        env::var("TICKETS_TABLE").unwrap_or_else(|_| "opd-queue-tickets".to_string())
    }

    /// DynamoDB table holding the append-only ticket history
    #[must_use]
    pub fn ticket_history_table(&self) -> String {
        env::var("TICKET_HISTORY_TABLE")
            .unwrap_or_else(|_| "opd-queue-ticket-history".to_string())
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

    /// Fixed per-person estimate used for wait-time ETAs, in minutes
    #[must_use]
    pub fn per_person_minutes(&self) -> u64 {
        env::var("PER_PERSON_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test explicit development
        env::set_var("APP_ENV", "development");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test staging
        env::set_var("APP_ENV", "staging");
        assert_eq!(Environment::from_env(), Environment::Staging);

        // Test production
        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_per_person_minutes_override() {
        env::remove_var("APP_ENV");
        env::set_var("PER_PERSON_MINUTES", "7");
        assert_eq!(Environment::from_env().per_person_minutes(), 7);

        env::set_var("PER_PERSON_MINUTES", "invalid");
        assert_eq!(Environment::from_env().per_person_minutes(), 5);

        env::remove_var("PER_PERSON_MINUTES");
    }
}
