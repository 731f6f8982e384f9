//! Review platform clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazyboost_core::{EnrichedReview, JudgeMeReview, ProductRef, StampedReview};
use serde_json::Value;
use tracing::info;

use super::{build_client, check_status};
use crate::api::ReviewPlatform;
use crate::error::ApiError;
use crate::secrets::{
    JUDGE_ME_PRIVATE_KEY, STAMPED_IO_API_KEY, STAMPED_IO_API_PUB_KEY, STAMPED_IO_STORE_HASH,
    SecretStore,
};

pub const JUDGE_ME_BASE_URL: &str = "https://judge.me/api/v1";
pub const STAMPED_BASE_URL: &str = "https://stamped.io/api";

/// Parse a JSON response, tolerating an empty body.
async fn json_or_null(resp: reqwest::Response) -> Result<Value, ApiError> {
    let text = check_status(resp).await?.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

pub struct JudgeMeClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    shop_domain: String,
}

impl JudgeMeClient {
    pub async fn from_secrets(
        secrets: Arc<dyn SecretStore>,
        shop_domain: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: JUDGE_ME_BASE_URL.to_string(),
            api_token: secrets.get(JUDGE_ME_PRIVATE_KEY).await?,
            shop_domain: shop_domain.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ReviewPlatform for JudgeMeClient {
    fn name(&self) -> &'static str {
        "judge.me"
    }

    fn payload(
        &self,
        review: &EnrichedReview,
        product: &ProductRef,
        _sku: &str,
    ) -> Result<Value, ApiError> {
        let body = JudgeMeReview::build(review, product, &self.shop_domain)?;
        Ok(serde_json::to_value(body)?)
    }

    async fn post(&self, payload: &Value) -> Result<Value, ApiError> {
        let resp = self
            .client
            .post(format!("{}/reviews", self.base_url))
            .query(&[
                ("shop_domain", self.shop_domain.as_str()),
                ("api_token", self.api_token.as_str()),
            ])
            .json(payload)
            .send()
            .await?;
        let body = json_or_null(resp).await?;
        info!(platform = "judge.me", "posted review");
        Ok(body)
    }
}

pub struct StampedClient {
    client: reqwest::Client,
    base_url: String,
    public_key: String,
    private_key: String,
    store_hash: String,
}

impl StampedClient {
    pub async fn from_secrets(
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: STAMPED_BASE_URL.to_string(),
            public_key: secrets.get(STAMPED_IO_API_PUB_KEY).await?,
            private_key: secrets.get(STAMPED_IO_API_KEY).await?,
            store_hash: secrets.get(STAMPED_IO_STORE_HASH).await?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ReviewPlatform for StampedClient {
    fn name(&self) -> &'static str {
        "stamped.io"
    }

    fn payload(
        &self,
        review: &EnrichedReview,
        product: &ProductRef,
        sku: &str,
    ) -> Result<Value, ApiError> {
        let body = StampedReview::build(review, product, sku)?;
        Ok(serde_json::to_value(body)?)
    }

    async fn post(&self, payload: &Value) -> Result<Value, ApiError> {
        let resp = self
            .client
            .post(format!("{}/{}/reviews3", self.base_url, self.store_hash))
            .basic_auth(&self.public_key, Some(&self.private_key))
            .json(payload)
            .send()
            .await?;
        let body = json_or_null(resp).await?;
        info!(platform = "stamped.io", "posted review");
        Ok(body)
    }
}
