//! Sync layer: platform capabilities, the reconciliation passes that drive
//! them, and (with `http`) the live Etsy, Shopify and review-platform clients.

pub mod api;
pub mod error;
pub mod handlers;
pub mod secrets;
pub mod task;

#[cfg(feature = "http")]
pub mod http;

#[cfg(test)]
mod testing;

pub use api::{Alerter, EtsyApi, ReviewPlatform, ShopifyApi};
pub use error::{ApiError, SecretError, SyncError};
pub use handlers::{
    CatalogExporter, ListingHandler, OrderHandler, ReviewExporter, ReviewHandler, SyncReport,
};
pub use secrets::{FileSecretStore, MemorySecretStore, SecretStore};
pub use task::{RunConfig, RunSummary, Task, TaskRunner};

#[cfg(feature = "http")]
pub use http::{EtsyClient, JudgeMeClient, ShopifyClient, StampedClient, WebhookAlerter};
