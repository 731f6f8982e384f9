//! Capabilities the reconciliation passes need from each platform.
//!
//! Handlers only see these traits. The HTTP clients in [`crate::http`]
//! implement them against the live APIs; tests use in-memory fakes.
//!
//! Batch fetches hand back raw JSON records so that one malformed record
//! fails on its own when the handler decodes it, instead of sinking the
//! whole page.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazyboost_core::{
    Address, Customer, EnrichedReview, Listing, ListingDraft, NewCustomer, Order, OrderDraft,
    ProductRef, SyncWindow, Transaction,
};
use serde_json::Value;

use crate::error::ApiError;

#[async_trait]
pub trait EtsyApi: Send + Sync {
    /// Paid, unshipped, non-canceled receipts modified inside `window`.
    async fn open_receipts(&self, window: &SyncWindow) -> Result<Vec<Value>, ApiError>;

    async fn receipt(&self, receipt_id: u64) -> Result<Order, ApiError>;

    async fn transaction(&self, transaction_id: u64) -> Result<Transaction, ApiError>;

    /// Shop reviews created inside `window`.
    async fn reviews(&self, window: &SyncWindow) -> Result<Vec<Value>, ApiError>;

    /// Every active listing in the shop, with its images.
    async fn active_listings(&self) -> Result<Vec<Value>, ApiError>;

    /// Create a draft listing, returning the new listing id.
    async fn create_listing(&self, draft: &ListingDraft) -> Result<u64, ApiError>;
}

#[async_trait]
pub trait ShopifyApi: Send + Sync {
    /// Whether any order already carries `tag`.
    async fn order_tagged(&self, tag: &str) -> Result<bool, ApiError>;

    async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, ApiError>;

    async fn set_default_address(&self, customer_id: u64, address_id: u64)
    -> Result<(), ApiError>;

    /// Save `address` on the customer, as default if `address.default` is set.
    async fn add_address(&self, customer_id: u64, address: &Address) -> Result<Address, ApiError>;

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, ApiError>;

    /// GraphQL id of the variant with exactly this SKU.
    async fn variant_by_sku(&self, sku: &str) -> Result<Option<String>, ApiError>;

    /// Product owning the variant with exactly this SKU.
    async fn product_by_sku(&self, sku: &str) -> Result<Option<ProductRef>, ApiError>;

    /// Active products updated after `since`, with their variants.
    async fn updated_listings(&self, since: DateTime<Utc>) -> Result<Vec<Listing>, ApiError>;

    /// Create the order, returning its GraphQL id.
    async fn create_order(&self, draft: &OrderDraft) -> Result<String, ApiError>;
}

/// A destination for imported reviews (Judge.me, Stamped.io).
#[async_trait]
pub trait ReviewPlatform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render the platform's request body for one review.
    fn payload(
        &self,
        review: &EnrichedReview,
        product: &ProductRef,
        sku: &str,
    ) -> Result<Value, ApiError>;

    async fn post(&self, payload: &Value) -> Result<Value, ApiError>;
}

/// Out-of-band notification for failed runs.
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn notify(&self, error: &str, at: DateTime<Utc>) -> Result<(), ApiError>;
}
