//! Shopify Admin API client.
//!
//! Orders, products and variants go through GraphQL; customer and address
//! maintenance uses the REST resources, which still expose search by email
//! and default-address promotion directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use lazyboost_core::{Address, Customer, Listing, NewCustomer, OrderDraft, ProductRef};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{build_client, check_status};
use crate::api::ShopifyApi;
use crate::error::ApiError;
use crate::secrets::{SHOPIFY_ACCESS_TOKEN, SHOPIFY_API_VERSION, SHOPIFY_SHOP_URL, SecretStore};

pub const DEFAULT_API_VERSION: &str = "2024-07";

const PRODUCTS_PAGE_SIZE: u32 = 50;

const ORDER_BY_TAG: &str = r#"
query OrderByTag($query: String!) {
  orders(first: 1, query: $query) {
    nodes { id }
  }
}"#;

const VARIANT_BY_SKU: &str = r#"
query VariantBySku($query: String!) {
  productVariants(first: 10, query: $query) {
    nodes {
      id
      sku
      product {
        id
        title
        handle
        onlineStoreUrl
        featuredImage { url }
      }
    }
  }
}"#;

const UPDATED_PRODUCTS: &str = r#"
query UpdatedProducts($query: String!, $first: Int!, $after: String) {
  products(first: $first, after: $after, query: $query) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      title
      description
      status
      productType
      tags
      totalInventory
      updatedAt
      hasOnlyDefaultVariant
      variants(first: 100) {
        nodes { id title sku price inventoryQuantity updatedAt }
      }
    }
  }
}"#;

const ORDER_CREATE: &str = r#"
mutation OrderCreate($order: OrderCreateOrderInput!, $options: OrderCreateOptionsInput) {
  orderCreate(order: $order, options: $options) {
    order { id name }
    userErrors { field message }
  }
}"#;

pub struct ShopifyClient {
    client: reqwest::Client,
    base_url: String,
    shop_domain: String,
    access_token: String,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct UserError {
    message: String,
    #[serde(default)]
    field: Option<Vec<String>>,
}

impl UserError {
    fn describe(&self) -> String {
        match &self.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), self.message),
            _ => self.message.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantNode {
    id: String,
    #[serde(default)]
    sku: Option<String>,
    product: ProductRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPage {
    page_info: PageInfo,
    nodes: Vec<Listing>,
}

/// Shopify search syntax quotes values with single quotes.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn field<T: DeserializeOwned>(
    data: &Value,
    pointer: &str,
    name: &'static str,
) -> Result<T, ApiError> {
    let node = data.pointer(pointer).ok_or(ApiError::Missing(name))?;
    Ok(serde_json::from_value(node.clone())?)
}

impl ShopifyClient {
    pub async fn from_secrets(
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let shop_domain = secrets.get(SHOPIFY_SHOP_URL).await?;
        let shop_domain = shop_domain
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();
        let version = match secrets.get(SHOPIFY_API_VERSION).await {
            Ok(v) => v,
            Err(_) => DEFAULT_API_VERSION.to_string(),
        };
        Ok(Self {
            client: build_client(timeout)?,
            base_url: format!("https://{shop_domain}/admin/api/{version}"),
            shop_domain,
            access_token: secrets.get(SHOPIFY_ACCESS_TOKEN).await?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// `<shop>.myshopify.com`, as the review platforms identify the store.
    pub fn shop_domain(&self) -> &str {
        &self.shop_domain
    }

    /// Run a GraphQL document and return its `data` object.
    ///
    /// A top-level `errors` array is reported as [`ApiError::GraphQl`], kept
    /// apart from transport failures.
    pub async fn query(&self, document: &str, variables: Value) -> Result<Value, ApiError> {
        let url = format!("{}/graphql.json", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await?;
        let mut body: Value = check_status(resp).await?.json().await?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            let errors: Vec<GraphQlError> = serde_json::from_value(errors.clone())?;
            return Err(ApiError::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        match body.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(ApiError::Missing("data")),
        }
    }

    /// Call a REST resource under the Admin API root, e.g.
    /// `customers/search.json`.
    pub async fn rest(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%method, url = %url, "shopify rest request");
        let mut req = self
            .client
            .request(method, &url)
            .header("X-Shopify-Access-Token", &self.access_token)
            .query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = check_status(req.send().await?).await?;
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Variants whose SKU equals `sku`. Shopify's search is token based, so
    /// near matches are filtered out here.
    async fn variants_with_sku(&self, sku: &str) -> Result<Vec<VariantNode>, ApiError> {
        let data = self
            .query(
                VARIANT_BY_SKU,
                json!({ "query": format!("sku:{}", quoted(sku)) }),
            )
            .await?;
        let nodes: Vec<VariantNode> = field(&data, "/productVariants/nodes", "productVariants")?;
        Ok(nodes
            .into_iter()
            .filter(|n| n.sku.as_deref() == Some(sku))
            .collect())
    }
}

#[async_trait]
impl ShopifyApi for ShopifyClient {
    async fn order_tagged(&self, tag: &str) -> Result<bool, ApiError> {
        let data = self
            .query(ORDER_BY_TAG, json!({ "query": format!("tag:{}", quoted(tag)) }))
            .await?;
        let nodes: Vec<Value> = field(&data, "/orders/nodes", "orders")?;
        Ok(!nodes.is_empty())
    }

    async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, ApiError> {
        let query = format!("email:{email}");
        let body = self
            .rest(
                Method::GET,
                "customers/search.json",
                &[("query", query.as_str())],
                None,
            )
            .await?;
        let customers: Vec<Customer> = field(&body, "/customers", "customers")?;
        // Search is fuzzy; only an exact email match counts.
        Ok(customers.into_iter().find(|c| {
            c.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        }))
    }

    async fn set_default_address(
        &self,
        customer_id: u64,
        address_id: u64,
    ) -> Result<(), ApiError> {
        self.rest(
            Method::PUT,
            &format!("customers/{customer_id}/addresses/{address_id}/default.json"),
            &[],
            None,
        )
        .await?;
        info!(customer_id, address_id, "promoted saved address to default");
        Ok(())
    }

    async fn add_address(&self, customer_id: u64, address: &Address) -> Result<Address, ApiError> {
        let body = self
            .rest(
                Method::POST,
                &format!("customers/{customer_id}/addresses.json"),
                &[],
                Some(&json!({ "address": address })),
            )
            .await?;
        let saved: Address = field(&body, "/customer_address", "customer_address")?;
        info!(
            customer_id,
            address_id = ?saved.id,
            default = address.default,
            "added customer address"
        );
        Ok(saved)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, ApiError> {
        let body = self
            .rest(
                Method::POST,
                "customers.json",
                &[],
                Some(&json!({ "customer": customer })),
            )
            .await?;
        let created: Customer = field(&body, "/customer", "customer")?;
        info!(customer_id = created.id, "created shopify customer");
        Ok(created)
    }

    async fn variant_by_sku(&self, sku: &str) -> Result<Option<String>, ApiError> {
        Ok(self
            .variants_with_sku(sku)
            .await?
            .into_iter()
            .next()
            .map(|v| v.id))
    }

    async fn product_by_sku(&self, sku: &str) -> Result<Option<ProductRef>, ApiError> {
        Ok(self
            .variants_with_sku(sku)
            .await?
            .into_iter()
            .next()
            .map(|v| v.product))
    }

    async fn updated_listings(&self, since: DateTime<Utc>) -> Result<Vec<Listing>, ApiError> {
        let search = format!(
            "status:active AND updated_at:>{}",
            quoted(&since.to_rfc3339_opts(SecondsFormat::Secs, true))
        );
        let mut listings = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let data = self
                .query(
                    UPDATED_PRODUCTS,
                    json!({ "query": search, "first": PRODUCTS_PAGE_SIZE, "after": after }),
                )
                .await?;
            let page: ProductPage = field(&data, "/products", "products")?;
            listings.extend(page.nodes);
            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }
        info!(count = listings.len(), since = %since, "fetched updated shopify products");
        Ok(listings)
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<String, ApiError> {
        let data = self
            .query(
                ORDER_CREATE,
                json!({
                    "order": draft,
                    "options": {
                        "sendReceipt": false,
                        "sendFulfillmentReceipt": false,
                        "inventoryBehaviour": "DECREMENT_OBEYING_POLICY"
                    }
                }),
            )
            .await?;

        let user_errors: Vec<UserError> =
            field(&data, "/orderCreate/userErrors", "orderCreate.userErrors")?;
        if !user_errors.is_empty() {
            return Err(ApiError::UserErrors(
                user_errors.iter().map(UserError::describe).collect(),
            ));
        }
        field(&data, "/orderCreate/order/id", "orderCreate.order.id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> ShopifyClient {
        let store = Arc::new(MemorySecretStore::new([
            (SHOPIFY_SHOP_URL, "https://lazyboost.myshopify.com/"),
            (SHOPIFY_ACCESS_TOKEN, "shpat_test"),
        ]));
        ShopifyClient::from_secrets(store, Duration::from_secs(5))
            .await
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn defaults_api_version_and_normalises_domain() {
        let store = Arc::new(MemorySecretStore::new([
            (SHOPIFY_SHOP_URL, "https://lazyboost.myshopify.com/"),
            (SHOPIFY_ACCESS_TOKEN, "t"),
        ]));
        let c = ShopifyClient::from_secrets(store, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(c.shop_domain(), "lazyboost.myshopify.com");
        assert_eq!(
            c.base_url,
            "https://lazyboost.myshopify.com/admin/api/2024-07"
        );
    }

    #[tokio::test]
    async fn tagged_order_is_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .and(header("X-Shopify-Access-Token", "shpat_test"))
            .and(body_partial_json(json!({ "variables": { "query": "tag:'ETSY_12345'" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "orders": { "nodes": [{ "id": "gid://shopify/Order/1" }] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        assert!(shopify.order_tagged("ETSY_12345").await.unwrap());
    }

    #[tokio::test]
    async fn graphql_errors_are_distinct_from_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Throttled" }]
            })))
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        match shopify.order_tagged("ETSY_1").await {
            Err(ApiError::GraphQl(msgs)) => assert_eq!(msgs, vec!["Throttled"]),
            other => panic!("expected GraphQL error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_errors_reject_order_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "orderCreate": {
                    "order": null,
                    "userErrors": [{ "field": ["order", "lineItems"], "message": "is invalid" }]
                } }
            })))
            .mount(&server)
            .await;

        let order = lazyboost_core::Order::from_value(crate::testing::receipt_json()).unwrap();
        let variants = crate::testing::variant_map();
        let draft = OrderDraft::build(&order, None, &variants).unwrap();

        let shopify = client(&server).await;
        match shopify.create_order(&draft).await {
            Err(ApiError::UserErrors(msgs)) => {
                assert_eq!(msgs, vec!["order.lineItems: is invalid"])
            }
            other => panic!("expected user errors, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn variant_lookup_requires_exact_sku() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "productVariants": { "nodes": [
                    {
                        "id": "gid://shopify/ProductVariant/1",
                        "sku": "BAN-PLAID-M-2",
                        "product": { "id": "gid://shopify/Product/9", "title": "A", "handle": "a" }
                    },
                    {
                        "id": "gid://shopify/ProductVariant/2",
                        "sku": "BAN-PLAID-M",
                        "product": {
                            "id": "gid://shopify/Product/10",
                            "title": "Plaid Bandana",
                            "handle": "plaid-bandana",
                            "onlineStoreUrl": null,
                            "featuredImage": { "url": "https://cdn.shopify.com/p.jpg" }
                        }
                    }
                ] } }
            })))
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        assert_eq!(
            shopify.variant_by_sku("BAN-PLAID-M").await.unwrap().as_deref(),
            Some("gid://shopify/ProductVariant/2")
        );
        let product = shopify.product_by_sku("BAN-PLAID-M").await.unwrap().unwrap();
        assert_eq!(product.legacy_id().unwrap(), 10);
        assert_eq!(product.featured_image_url(), Some("https://cdn.shopify.com/p.jpg"));
        assert!(shopify.variant_by_sku("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn customer_search_matches_email_exactly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers/search.json"))
            .and(query_param("query", "email:jane@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "customers": [
                    { "id": 1, "email": "jane@example.com.au", "addresses": [] },
                    { "id": 2, "email": "Jane@Example.com", "addresses": [] }
                ]
            })))
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        let c = shopify
            .customer_by_email("jane@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.id, 2);
    }

    #[tokio::test]
    async fn untagged_order_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .and(body_partial_json(json!({ "variables": { "query": "tag:'ETSY_999'" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "orders": { "nodes": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        assert!(!shopify.order_tagged("ETSY_999").await.unwrap());
    }

    #[tokio::test]
    async fn create_customer_posts_wrapped_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customers.json"))
            .and(header("X-Shopify-Access-Token", "shpat_test"))
            .and(body_partial_json(json!({ "customer": {
                "email": "jane@example.com",
                "first_name": "Jane Q",
                "last_name": "Public",
                "verified_email": true,
                "send_email_welcome": false,
                "tags": "ETSY_BUYER_ID_777"
            } })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "customer": { "id": 55, "email": "jane@example.com", "addresses": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let customer = NewCustomer {
            first_name: "Jane Q".into(),
            last_name: "Public".into(),
            email: "jane@example.com".into(),
            verified_email: true,
            send_email_welcome: false,
            tags: "ETSY_BUYER_ID_777".into(),
        };
        let shopify = client(&server).await;
        let created = shopify.create_customer(&customer).await.unwrap();
        assert_eq!(created.id, 55);
        assert_eq!(created.email.as_deref(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn add_address_posts_default_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customers/55/addresses.json"))
            .and(body_partial_json(json!({ "address": {
                "address1": "1 Main St",
                "city": "Springfield",
                "country_code": "US",
                "default": true
            } })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "customer_address": {
                    "id": 8,
                    "address1": "1 Main St",
                    "city": "Springfield",
                    "country_code": "US",
                    "default": true
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let address = Address {
            first_name: Some("Jane Q".into()),
            last_name: Some("Public".into()),
            address1: Some("1 Main St".into()),
            city: Some("Springfield".into()),
            province_code: Some("IL".into()),
            zip: Some("62701".into()),
            country_code: Some("US".into()),
            default: true,
            ..Address::default()
        };
        let shopify = client(&server).await;
        let saved = shopify.add_address(55, &address).await.unwrap();
        assert_eq!(saved.id, Some(8));
        assert!(saved.default);
    }

    #[tokio::test]
    async fn set_default_address_puts_to_address() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/customers/55/addresses/8/default.json"))
            .and(header("X-Shopify-Access-Token", "shpat_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "customer_address": { "id": 8, "default": true }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/customers/55/addresses/9/default.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        shopify.set_default_address(55, 8).await.unwrap();
        // An empty success body is accepted too.
        shopify.set_default_address(55, 9).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_address_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customers/55/addresses.json"))
            .respond_with(
                ResponseTemplate::new(422).set_body_string(r#"{"errors":{"zip":["is invalid"]}}"#),
            )
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        match shopify.add_address(55, &Address::default()).await {
            Err(ApiError::Server { status, .. }) => assert_eq!(status, 422),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn products_follow_cursor() {
        let server = MockServer::start().await;
        let product = |id: u32| {
            json!({
                "id": format!("gid://shopify/Product/{id}"),
                "title": "P",
                "status": "ACTIVE",
                "totalInventory": 1,
                "updatedAt": "2024-05-01T12:00:00Z",
                "hasOnlyDefaultVariant": true,
                "variants": { "nodes": [] }
            })
        };
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .and(body_partial_json(json!({ "variables": { "after": null } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "products": {
                    "pageInfo": { "hasNextPage": true, "endCursor": "c1" },
                    "nodes": [product(1)]
                } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .and(body_partial_json(json!({ "variables": { "after": "c1" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "products": {
                    "pageInfo": { "hasNextPage": false, "endCursor": null },
                    "nodes": [product(2)]
                } }
            })))
            .mount(&server)
            .await;

        let shopify = client(&server).await;
        let listings = shopify
            .updated_listings(Utc::now() - chrono::TimeDelta::minutes(17))
            .await
            .unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].id, "gid://shopify/Product/2");
    }
}
