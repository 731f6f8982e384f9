//! reqwest-backed clients for the live platforms.

pub mod etsy;
pub mod reviews;
pub mod shopify;
pub mod webhook;

use std::time::Duration;

use crate::error::ApiError;

pub use etsy::EtsyClient;
pub use reviews::{JudgeMeClient, StampedClient};
pub use shopify::ShopifyClient;
pub use webhook::WebhookAlerter;

/// Every remote call carries this timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("lazyboost/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Turn a non-2xx response into [`ApiError::Server`], keeping the body for
/// the logs.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Server {
        status: status.as_u16(),
        body,
    })
}
