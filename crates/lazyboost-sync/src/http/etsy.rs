//! Etsy Open API v3 client with transparent OAuth token rotation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazyboost_core::{ListingDraft, Order, SyncWindow, Transaction};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{build_client, check_status};
use crate::api::EtsyApi;
use crate::error::ApiError;
use crate::secrets::{
    ETSY_ACCESS_TOKEN, ETSY_KEY_STRING, ETSY_REFRESH_TOKEN, ETSY_SHOP_ID, SecretStore,
};

pub const API_BASE_URL: &str = "https://openapi.etsy.com/v3/application";
pub const TOKEN_URL: &str = "https://openapi.etsy.com/v3/public/oauth/token";

/// Etsy's maximum page size for receipts, reviews and listings.
const PAGE_LIMIT: usize = 100;

struct Tokens {
    access: String,
    refresh: String,
}

pub struct EtsyClient {
    client: reqwest::Client,
    base_url: String,
    token_url: String,
    key_string: String,
    shop_id: String,
    tokens: RwLock<Tokens>,
    secrets: Arc<dyn SecretStore>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct Page {
    count: usize,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Deserialize)]
struct CreatedListing {
    listing_id: u64,
}

/// Etsy answers an expired or revoked access token with
/// `401 {"error": "invalid_token"}`.
fn is_invalid_token(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(|e| e == "invalid_token"))
        .unwrap_or(false)
}

impl EtsyClient {
    pub async fn from_secrets(
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let tokens = Tokens {
            access: secrets.get(ETSY_ACCESS_TOKEN).await?,
            refresh: secrets.get(ETSY_REFRESH_TOKEN).await?,
        };
        Ok(Self {
            client: build_client(timeout)?,
            base_url: API_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            key_string: secrets.get(ETSY_KEY_STRING).await?,
            shop_id: secrets.get(ETSY_SHOP_ID).await?,
            tokens: RwLock::new(tokens),
            secrets,
        })
    }

    /// Point the client at another host (mock servers in tests).
    pub fn with_base_urls(mut self, api: &str, token: &str) -> Self {
        self.base_url = api.trim_end_matches('/').to_string();
        self.token_url = token.to_string();
        self
    }

    /// Issue an authenticated request and return the JSON body.
    ///
    /// An `invalid_token` rejection triggers one token refresh and one retry;
    /// any other non-2xx response, or a second rejection, is an error.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        form: Option<&[(String, String)]>,
    ) -> Result<Value, ApiError> {
        let resp = self.send(method.clone(), path, query, form).await?;

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            if !is_invalid_token(&body) {
                return Err(ApiError::Server { status: 401, body });
            }
            warn!(path, "etsy access token rejected, refreshing");
            self.refresh().await?;
            self.send(method, path, query, form).await?
        } else {
            resp
        };

        Ok(check_status(resp).await?.json().await?)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        form: Option<&[(String, String)]>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let access = self.tokens.read().await.access.clone();
        debug!(%method, url = %url, "etsy request");

        let mut req = self
            .client
            .request(method, &url)
            .header("x-api-key", &self.key_string)
            .bearer_auth(access)
            .query(query);
        if let Some(form) = form {
            req = req.form(form);
        }
        Ok(req.send().await?)
    }

    /// Exchange the refresh token, then save both rotated tokens.
    async fn refresh(&self) -> Result<(), ApiError> {
        let mut tokens = self.tokens.write().await;
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.key_string.as_str()),
                ("refresh_token", tokens.refresh.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::TokenRefresh(format!("{status}: {body}")));
        }
        let fresh: TokenResponse = resp.json().await?;

        self.secrets
            .set(ETSY_ACCESS_TOKEN, fresh.access_token.clone())
            .await?;
        self.secrets
            .set(ETSY_REFRESH_TOKEN, fresh.refresh_token.clone())
            .await?;
        self.secrets.persist().await?;

        *tokens = Tokens {
            access: fresh.access_token,
            refresh: fresh.refresh_token,
        };
        info!("rotated etsy oauth tokens");
        Ok(())
    }

    /// Walk `limit`/`offset` pages until `count` records have been read.
    async fn paginate(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, ApiError> {
        let mut results: Vec<Value> = Vec::new();
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("limit", PAGE_LIMIT.to_string()));
            page_query.push(("offset", results.len().to_string()));

            let page: Page =
                serde_json::from_value(self.request(Method::GET, path, &page_query, None).await?)?;
            let fetched = page.results.len();
            results.extend(page.results);
            if fetched == 0 || results.len() >= page.count {
                break;
            }
        }
        Ok(results)
    }

    fn shop_path(&self, rest: &str) -> String {
        format!("shops/{}/{rest}", self.shop_id)
    }
}

#[async_trait]
impl EtsyApi for EtsyClient {
    async fn open_receipts(&self, window: &SyncWindow) -> Result<Vec<Value>, ApiError> {
        let query = [
            ("min_last_modified", window.start_epoch().to_string()),
            ("max_last_modified", window.end_epoch().to_string()),
            ("was_paid", "true".to_string()),
            ("was_shipped", "false".to_string()),
            ("was_canceled", "false".to_string()),
            ("sort_on", "created".to_string()),
            ("sort_order", "asc".to_string()),
        ];
        let receipts = self.paginate(&self.shop_path("receipts"), &query).await?;
        info!(count = receipts.len(), "fetched open etsy receipts");
        Ok(receipts)
    }

    async fn receipt(&self, receipt_id: u64) -> Result<Order, ApiError> {
        let value = self
            .request(
                Method::GET,
                &self.shop_path(&format!("receipts/{receipt_id}")),
                &[],
                None,
            )
            .await?;
        Ok(Order::from_value(value)?)
    }

    async fn transaction(&self, transaction_id: u64) -> Result<Transaction, ApiError> {
        let value = self
            .request(
                Method::GET,
                &self.shop_path(&format!("transactions/{transaction_id}")),
                &[],
                None,
            )
            .await?;
        Ok(Transaction::from_value(value)?)
    }

    async fn reviews(&self, window: &SyncWindow) -> Result<Vec<Value>, ApiError> {
        let query = [
            ("min_created", window.start_epoch().to_string()),
            ("max_created", window.end_epoch().to_string()),
        ];
        let reviews = self.paginate(&self.shop_path("reviews"), &query).await?;
        info!(count = reviews.len(), "fetched etsy reviews");
        Ok(reviews)
    }

    async fn active_listings(&self) -> Result<Vec<Value>, ApiError> {
        let query = [
            ("state", "active".to_string()),
            ("includes", "Images".to_string()),
        ];
        let listings = self.paginate(&self.shop_path("listings"), &query).await?;
        info!(count = listings.len(), "fetched active etsy listings");
        Ok(listings)
    }

    async fn create_listing(&self, draft: &ListingDraft) -> Result<u64, ApiError> {
        let form = draft.to_form();
        let value = self
            .request(Method::POST, &self.shop_path("listings"), &[], Some(&form))
            .await?;
        let created: CreatedListing = serde_json::from_value(value)?;
        info!(
            listing_id = created.listing_id,
            variant = %draft.source_variant,
            "created etsy draft listing"
        );
        Ok(created.listing_id)
    }
}
