//! Etsy shop reviews and the Shopify product they end up attached to.

use serde::Deserialize;
use serde_json::Value;

use crate::order::{Order, Transaction};
use crate::{DecodeError, MappingError};

/// A review left on the Etsy shop.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub shop_id: u64,
    pub listing_id: u64,
    pub transaction_id: u64,
    pub buyer_user_id: Option<u64>,
    pub rating: u8,
    /// May be empty; Etsy allows star-only reviews.
    pub body: String,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub created: i64,
    pub updated: i64,
}

impl Review {
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let raw: RawReview = serde_json::from_value(value)?;
        raw.try_into()
    }

    /// Attach the transaction and receipt resolved for this review.
    pub fn enrich(self, transaction: Transaction, order: Order) -> EnrichedReview {
        EnrichedReview {
            review: self,
            transaction,
            order,
        }
    }
}

/// A review with its transaction and parent order resolved.
///
/// Only this type can be transformed for a review platform.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedReview {
    pub review: Review,
    pub transaction: Transaction,
    pub order: Order,
}

impl EnrichedReview {
    /// SKU of the reviewed item; reviews without one cannot be matched.
    pub fn sku(&self) -> Result<&str, MappingError> {
        self.transaction
            .sku
            .as_deref()
            .ok_or(MappingError::MissingSku(self.transaction.transaction_id))
    }

    pub fn reviewer_name(&self) -> &str {
        &self.order.buyer.name
    }

    pub fn reviewer_email(&self) -> Option<&str> {
        self.order.buyer.email.as_deref()
    }
}

/// A Shopify product resolved by SKU, as much of it as review platforms
/// need.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    /// GraphQL id, e.g. `gid://shopify/Product/632910392`.
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub online_store_url: Option<String>,
    #[serde(default)]
    pub featured_image: Option<Image>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Image {
    pub url: String,
}

impl ProductRef {
    /// Numeric id at the tail of the GraphQL id.
    pub fn legacy_id(&self) -> Result<u64, DecodeError> {
        legacy_id(&self.id)
    }

    pub fn featured_image_url(&self) -> Option<&str> {
        self.featured_image.as_ref().map(|i| i.url.as_str())
    }
}

/// Parse `gid://shopify/<Type>/<id>` (optionally with a query string) into
/// its numeric id.
pub fn legacy_id(gid: &str) -> Result<u64, DecodeError> {
    gid.rsplit('/')
        .next()
        .map(|tail| tail.split('?').next().unwrap_or(tail))
        .and_then(|tail| tail.parse().ok())
        .ok_or_else(|| DecodeError::Gid(gid.to_string()))
}

#[derive(Debug, Deserialize)]
struct RawReview {
    shop_id: u64,
    listing_id: u64,
    transaction_id: u64,
    #[serde(default)]
    buyer_user_id: Option<u64>,
    rating: i64,
    #[serde(default)]
    review: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    image_url_fullxfull: Option<String>,
    create_timestamp: i64,
    update_timestamp: i64,
}

impl TryFrom<RawReview> for Review {
    type Error = DecodeError;

    fn try_from(raw: RawReview) -> Result<Self, Self::Error> {
        let rating = u8::try_from(raw.rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or(DecodeError::Rating(raw.rating))?;

        // Older payloads carry the literal string "None" for missing images.
        let image_url = raw
            .image_url_fullxfull
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty() && u != "None");

        Ok(Self {
            shop_id: raw.shop_id,
            listing_id: raw.listing_id,
            transaction_id: raw.transaction_id,
            buyer_user_id: raw.buyer_user_id,
            rating,
            body: raw.review.unwrap_or_default(),
            language: raw.language,
            image_url,
            created: raw.create_timestamp,
            updated: raw.update_timestamp,
        })
    }
}
