//! Reqwest client for the HIS REST facade

use std::time::Duration;

use async_trait::async_trait;
use queue_storage::day;
use serde::de::DeserializeOwned;

use super::{DispenseRecord, RecordSource, SlotCall, SourceError, SourceResult, VisitKeys};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the read-only HIS facade
pub struct HisGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HisGateway {
    /// Creates a gateway client
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("failed to build HIS HTTP client");

        Self { http, base_url }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, today_scoped: bool) -> SourceResult<T> {
        let mut request = self.http.get(format!("{}{path}", self.base_url));
        if today_scoped {
            request = request.query(&[("date", day::today())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RecordSource for HisGateway {
    async fn fetch_preparing_today(&self) -> SourceResult<Vec<DispenseRecord>> {
        self.get_json("/v1/dispense/preparing", true).await
    }

    async fn fetch_ready_today(&self) -> SourceResult<Vec<DispenseRecord>> {
        self.get_json("/v1/dispense/ready", true).await
    }

    async fn fetch_payment_calls_today(&self) -> SourceResult<Vec<SlotCall>> {
        self.get_json("/v1/calls/payment", true).await
    }

    async fn fetch_pickup_calls_today(&self) -> SourceResult<Vec<SlotCall>> {
        self.get_json("/v1/calls/pickup", true).await
    }

    async fn fetch_visit_keys(&self, visit_id: &str) -> SourceResult<Option<VisitKeys>> {
        let response = self
            .http
            .get(format!("{}/v1/visits/{visit_id}/keys", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        Ok(Some(response.json().await?))
    }
}
