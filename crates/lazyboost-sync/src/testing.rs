//! Fixtures and in-memory platform fakes shared by the handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazyboost_core::{
    Address, Customer, EnrichedReview, JudgeMeReview, Listing, ListingDraft, NewCustomer, Order,
    OrderDraft, ProductRef, Review, SyncWindow, Transaction,
};
use serde_json::{Value, json};

use crate::api::{Alerter, EtsyApi, ReviewPlatform, ShopifyApi};
use crate::error::ApiError;

fn money(amount: i64) -> Value {
    json!({ "amount": amount, "divisor": 100, "currency_code": "USD" })
}

pub(crate) fn transaction_json(transaction_id: u64, sku: Option<&str>) -> Value {
    json!({
        "transaction_id": transaction_id,
        "receipt_id": 12345,
        "listing_id": 55,
        "title": "Plaid Bandana",
        "sku": sku,
        "quantity": 2,
        "price": money(2500),
        "shipping_cost": money(400)
    })
}

/// Receipt 12345: 2 x 25.00 + 1 x 30.00, 5.00 off, 6.50 shipping, 4.80 tax.
pub(crate) fn receipt_json() -> Value {
    receipt_with_id(12345)
}

pub(crate) fn receipt_with_id(receipt_id: u64) -> Value {
    json!({
        "receipt_id": receipt_id,
        "buyer_user_id": 777,
        "name": "Jane Q Public",
        "buyer_email": "jane@example.com",
        "first_line": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "zip": "62701",
        "country_iso": "US",
        "is_shipped": false,
        "is_gift": false,
        "create_timestamp": 1714564800,
        "update_timestamp": 1714565400,
        "grandtotal": money(8630),
        "total_price": money(8000),
        "total_shipping_cost": money(650),
        "total_tax_cost": money(480),
        "discount_amt": money(500),
        "transactions": [
            transaction_json(1, Some("BAN-PLAID-M")),
            {
                "transaction_id": 2,
                "receipt_id": receipt_id,
                "title": "Velvet Bow",
                "sku": "BOW-VELVET",
                "quantity": 1,
                "price": money(3000),
                "shipping_cost": money(250)
            }
        ]
    })
}

pub(crate) fn review_json(transaction_id: u64, rating: u8) -> Value {
    json!({
        "shop_id": 42,
        "listing_id": 55,
        "transaction_id": transaction_id,
        "buyer_user_id": 777,
        "rating": rating,
        "review": "Adorable and well made!",
        "language": "en",
        "image_url_fullxfull": null,
        "create_timestamp": 1714564800,
        "update_timestamp": 1714564800
    })
}

pub(crate) fn etsy_listing_json(listing_id: u64, sku: Option<&str>) -> Value {
    json!({
        "listing_id": listing_id,
        "state": "active",
        "title": format!("Listing {listing_id}"),
        "description": "Soft cotton bandana.",
        "quantity": 4,
        "price": money(2400),
        "skus": sku.into_iter().collect::<Vec<_>>(),
        "images": [{
            "url_fullxfull": format!("https://i.etsystatic.com/{listing_id}/1.jpg"),
            "rank": 1
        }]
    })
}

pub(crate) fn variant_map() -> HashMap<String, String> {
    HashMap::from([
        ("BAN-PLAID-M".to_string(), "gid://shopify/ProductVariant/11".to_string()),
        ("BOW-VELVET".to_string(), "gid://shopify/ProductVariant/12".to_string()),
    ])
}

pub(crate) fn product_ref() -> ProductRef {
    serde_json::from_value(json!({
        "id": "gid://shopify/Product/632910392",
        "title": "Plaid Bandana",
        "handle": "plaid-bandana",
        "onlineStoreUrl": "https://lazyboost.example/products/plaid-bandana",
        "featuredImage": { "url": "https://cdn.shopify.com/plaid.jpg" }
    }))
    .unwrap()
}

pub(crate) fn enriched_review() -> EnrichedReview {
    let order = Order::from_value(receipt_json()).unwrap();
    let transaction = order.transactions[0].clone();
    Review::from_value(review_json(1, 5))
        .unwrap()
        .enrich(transaction, order)
}

pub(crate) fn listing(
    id: u64,
    updated_at: DateTime<Utc>,
    total_inventory: i64,
    variants: &[(u64, DateTime<Utc>, i64)],
) -> Listing {
    let nodes: Vec<Value> = variants
        .iter()
        .map(|(vid, ts, inv)| {
            json!({
                "id": format!("gid://shopify/ProductVariant/{vid}"),
                "title": format!("Size {vid}"),
                "sku": format!("SKU-{vid}"),
                "price": "24.00",
                "inventoryQuantity": inv,
                "updatedAt": ts.to_rfc3339()
            })
        })
        .collect();
    serde_json::from_value(json!({
        "id": format!("gid://shopify/Product/{id}"),
        "title": "Plaid Bandana",
        "description": "This bandana is made with cotton and love.",
        "status": "ACTIVE",
        "productType": "Bandanas",
        "tags": ["Fall"],
        "totalInventory": total_inventory,
        "updatedAt": updated_at.to_rfc3339(),
        "hasOnlyDefaultVariant": variants.len() == 1,
        "variants": { "nodes": nodes }
    }))
    .unwrap()
}

fn not_found(what: &str) -> ApiError {
    ApiError::Server {
        status: 404,
        body: format!("{what} not found"),
    }
}

#[derive(Default)]
pub(crate) struct FakeEtsy {
    pub receipts: Vec<Value>,
    pub receipts_by_id: HashMap<u64, Value>,
    pub transactions: HashMap<u64, Value>,
    pub reviews: Vec<Value>,
    pub active_listings: Vec<Value>,
    pub fail_fetch: bool,
    pub reject_listing_titles: HashSet<String>,
    pub created_listings: Mutex<Vec<ListingDraft>>,
}

#[async_trait]
impl EtsyApi for FakeEtsy {
    async fn open_receipts(&self, _window: &SyncWindow) -> Result<Vec<Value>, ApiError> {
        if self.fail_fetch {
            return Err(ApiError::Server {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(self.receipts.clone())
    }

    async fn receipt(&self, receipt_id: u64) -> Result<Order, ApiError> {
        let value = self
            .receipts_by_id
            .get(&receipt_id)
            .cloned()
            .ok_or_else(|| not_found("receipt"))?;
        Ok(Order::from_value(value)?)
    }

    async fn transaction(&self, transaction_id: u64) -> Result<Transaction, ApiError> {
        let value = self
            .transactions
            .get(&transaction_id)
            .cloned()
            .ok_or_else(|| not_found("transaction"))?;
        Ok(Transaction::from_value(value)?)
    }

    async fn reviews(&self, _window: &SyncWindow) -> Result<Vec<Value>, ApiError> {
        if self.fail_fetch {
            return Err(ApiError::Server {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(self.reviews.clone())
    }

    async fn active_listings(&self) -> Result<Vec<Value>, ApiError> {
        if self.fail_fetch {
            return Err(ApiError::Server {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(self.active_listings.clone())
    }

    async fn create_listing(&self, draft: &ListingDraft) -> Result<u64, ApiError> {
        if self.reject_listing_titles.contains(&draft.title) {
            return Err(ApiError::Server {
                status: 400,
                body: "invalid listing".into(),
            });
        }
        let mut created = self.created_listings.lock().unwrap();
        created.push(draft.clone());
        Ok(created.len() as u64)
    }
}

#[derive(Default)]
pub(crate) struct FakeShopify {
    pub tagged: Mutex<HashSet<String>>,
    pub customers: Mutex<Vec<Customer>>,
    pub variants: HashMap<String, String>,
    pub products: HashMap<String, ProductRef>,
    pub listings: Vec<Listing>,
    pub orders: Mutex<Vec<OrderDraft>>,
    /// Customer/address mutations in call order.
    pub calls: Mutex<Vec<String>>,
    pub fail_customer_search: bool,
    pub next_id: AtomicU64,
}

impl FakeShopify {
    pub(crate) fn with_variants() -> Self {
        Self {
            variants: variant_map(),
            ..Self::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_id(&self) -> u64 {
        1000 + self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl ShopifyApi for FakeShopify {
    async fn order_tagged(&self, tag: &str) -> Result<bool, ApiError> {
        Ok(self.tagged.lock().unwrap().contains(tag))
    }

    async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, ApiError> {
        if self.fail_customer_search {
            return Err(ApiError::Server {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn set_default_address(
        &self,
        customer_id: u64,
        address_id: u64,
    ) -> Result<(), ApiError> {
        self.record(format!("default:{customer_id}:{address_id}"));
        Ok(())
    }

    async fn add_address(&self, customer_id: u64, address: &Address) -> Result<Address, ApiError> {
        self.record(format!("add_address:{customer_id}:default={}", address.default));
        Ok(Address {
            id: Some(self.next_id()),
            ..address.clone()
        })
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, ApiError> {
        self.record(format!("create_customer:{}", customer.email));
        let created = Customer {
            id: self.next_id(),
            email: Some(customer.email.clone()),
            first_name: Some(customer.first_name.clone()),
            last_name: Some(customer.last_name.clone()),
            addresses: Vec::new(),
            default_address: None,
        };
        self.customers.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn variant_by_sku(&self, sku: &str) -> Result<Option<String>, ApiError> {
        Ok(self.variants.get(sku).cloned())
    }

    async fn product_by_sku(&self, sku: &str) -> Result<Option<ProductRef>, ApiError> {
        Ok(self.products.get(sku).cloned())
    }

    async fn updated_listings(&self, _since: DateTime<Utc>) -> Result<Vec<Listing>, ApiError> {
        Ok(self.listings.clone())
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<String, ApiError> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(draft.clone());
        self.tagged.lock().unwrap().extend(draft.tags.iter().cloned());
        Ok(format!("gid://shopify/Order/{}", orders.len()))
    }
}

#[derive(Default)]
pub(crate) struct FakeReviews {
    pub posted: Mutex<Vec<Value>>,
    pub reject_rating: Option<u8>,
}

#[async_trait]
impl ReviewPlatform for FakeReviews {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn payload(
        &self,
        review: &EnrichedReview,
        product: &ProductRef,
        _sku: &str,
    ) -> Result<Value, ApiError> {
        Ok(serde_json::to_value(JudgeMeReview::build(
            review,
            product,
            "lazyboost.myshopify.com",
        )?)?)
    }

    async fn post(&self, payload: &Value) -> Result<Value, ApiError> {
        if let Some(rating) = self.reject_rating
            && payload["rating"] == json!(rating)
        {
            return Err(ApiError::Server {
                status: 422,
                body: "rejected".into(),
            });
        }
        self.posted.lock().unwrap().push(payload.clone());
        Ok(json!({ "ok": true }))
    }
}

#[derive(Default)]
pub(crate) struct FakeAlerter {
    pub alerts: Mutex<Vec<(String, DateTime<Utc>)>>,
}

#[async_trait]
impl Alerter for FakeAlerter {
    async fn notify(&self, error: &str, at: DateTime<Utc>) -> Result<(), ApiError> {
        self.alerts.lock().unwrap().push((error.to_string(), at));
        Ok(())
    }
}
