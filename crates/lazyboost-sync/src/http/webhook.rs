//! Failure alerts delivered to a JSON webhook (Slack, SNS HTTP endpoint,
//! or anything that accepts a POST).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{build_client, check_status};
use crate::api::Alerter;
use crate::error::ApiError;

pub struct WebhookAlerter {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct AlertBody<'a> {
    source: &'static str,
    error: &'a str,
    timestamp: String,
    /// Slack-compatible summary line.
    text: String,
}

impl WebhookAlerter {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Alerter for WebhookAlerter {
    async fn notify(&self, error: &str, at: DateTime<Utc>) -> Result<(), ApiError> {
        let timestamp = at.to_rfc3339();
        let body = AlertBody {
            source: "lazyboost",
            error,
            text: format!("LazyBoost run failed at {timestamp}: {error}"),
            timestamp,
        };
        let resp = self.client.post(&self.url).json(&body).send().await?;
        check_status(resp).await?;
        info!("sent failure alert");
        Ok(())
    }
}
