//! Shopify products and variants, as returned by the Admin GraphQL API.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::window::SyncWindow;

/// Shopify `ProductStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Active,
    Archived,
    Draft,
    #[serde(other)]
    Other,
}

/// A purchasable configuration of a listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(deserialize_with = "decimal")]
    pub price: f64,
    /// `None` when Shopify does not track inventory for the variant.
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Untracked inventory counts as nothing on hand.
    pub fn inventory(&self) -> i64 {
        self.inventory_quantity.unwrap_or(0)
    }
}

/// A Shopify product with its variants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: ListingStatus,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_inventory: i64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub has_only_default_variant: bool,
    #[serde(deserialize_with = "nodes")]
    pub variants: Vec<Variant>,
}

impl Listing {
    /// A listing whose only variant is Shopify's implicit default one. A
    /// product with a single real option is not one of these.
    pub fn is_single_variant(&self) -> bool {
        self.has_only_default_variant
    }

    /// Variants that changed inside `window` and should be pushed to Etsy.
    ///
    /// Listings with nothing in stock are never eligible. A default-variant
    /// listing is judged by the listing timestamp alone; otherwise each
    /// variant is judged by its own timestamp and must have stock.
    pub fn eligible_variants(&self, window: &SyncWindow) -> Vec<&Variant> {
        if self.total_inventory < 1 {
            return Vec::new();
        }

        if self.is_single_variant() {
            if window.changed_since_start(self.updated_at) {
                return self.variants.first().into_iter().collect();
            }
            return Vec::new();
        }

        self.variants
            .iter()
            .filter(|v| window.changed_since_start(v.updated_at) && v.inventory() > 0)
            .collect()
    }
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

/// Unwrap a GraphQL connection's `{ "nodes": [...] }`.
pub(crate) fn nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Nodes::deserialize(deserializer)?.nodes)
}

/// Shopify's `Money`/`Decimal` scalars arrive as strings; accept numbers too.
fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid decimal {s:?}"))),
    }
}
