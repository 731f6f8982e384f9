//! Enriched Etsy reviews rendered for the review platforms and the
//! Judge.me CSV importer.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;

use crate::review::{EnrichedReview, ProductRef};
use crate::DecodeError;

/// Etsy reviews have no title; every imported review gets this one.
pub const REVIEW_TITLE: &str = "Etsy Review";
pub const REVIEW_LOCATION: &str = "United States";
pub const JUDGE_ME_PLATFORM: &str = "shopify";
pub const JUDGE_ME_NAME_FORMAT: &str = "last_initial";
/// `review_date` column format expected by the Judge.me importer.
pub const REVIEW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Review platforms reject empty bodies.
fn body_or_space(body: &str) -> String {
    if body.trim().is_empty() {
        " ".to_string()
    } else {
        body.to_string()
    }
}

/// Body of `POST /api/v1/reviews` on Judge.me.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeMeReview {
    pub shop_domain: String,
    pub platform: &'static str,
    /// Numeric Shopify product id.
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub rating: u8,
    pub title: &'static str,
    pub body: String,
    pub review_name_format: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub picture_urls: BTreeMap<String, String>,
}

impl JudgeMeReview {
    pub fn build(
        review: &EnrichedReview,
        product: &ProductRef,
        shop_domain: &str,
    ) -> Result<Self, DecodeError> {
        let picture_urls = review
            .review
            .image_url
            .iter()
            .map(|url| ("0".to_string(), url.clone()))
            .collect();

        Ok(Self {
            shop_domain: shop_domain.to_string(),
            platform: JUDGE_ME_PLATFORM,
            id: product.legacy_id()?,
            name: review.reviewer_name().to_string(),
            email: review.reviewer_email().map(str::to_string),
            rating: review.review.rating,
            title: REVIEW_TITLE,
            body: body_or_space(&review.review.body),
            review_name_format: JUDGE_ME_NAME_FORMAT,
            picture_urls,
        })
    }
}

/// Body of Stamped.io's `reviews3` create call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampedReview {
    pub product_id: u64,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub location: &'static str,
    pub review_rating: u8,
    pub review_title: &'static str,
    pub review_message: String,
    pub review_recommend_product: bool,
    #[serde(rename = "productSKU")]
    pub product_sku: String,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    #[serde(rename = "photo0", skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl StampedReview {
    pub fn build(
        review: &EnrichedReview,
        product: &ProductRef,
        sku: &str,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            product_id: product.legacy_id()?,
            author: review.reviewer_name().to_string(),
            email: review.reviewer_email().map(str::to_string),
            location: REVIEW_LOCATION,
            review_rating: review.review.rating,
            review_title: REVIEW_TITLE,
            review_message: body_or_space(&review.review.body),
            review_recommend_product: true,
            product_sku: sku.to_string(),
            product_name: product.title.clone(),
            product_image_url: product.featured_image_url().map(str::to_string),
            product_url: product.online_store_url.clone(),
            photo: review.review.image_url.clone(),
        })
    }
}

/// One line of the Judge.me review import CSV. Field order is the column
/// order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewCsvRow {
    pub title: &'static str,
    pub body: String,
    pub rating: u8,
    pub review_date: String,
    pub reviewer_name: String,
    pub reviewer_email: String,
    pub product_id: Option<u64>,
    pub product_handle: String,
    pub reply: &'static str,
    pub picture_urls: String,
}

pub const CSV_HEADER: [&str; 10] = [
    "title",
    "body",
    "rating",
    "review_date",
    "reviewer_name",
    "reviewer_email",
    "product_id",
    "product_handle",
    "reply",
    "picture_urls",
];

impl ReviewCsvRow {
    /// Rows are still written for reviews whose product could not be
    /// resolved; the product columns are left blank for manual fixing.
    pub fn build(
        review: &EnrichedReview,
        product: Option<&ProductRef>,
    ) -> Result<Self, DecodeError> {
        let created = review.review.created;
        let review_date = DateTime::from_timestamp(created, 0)
            .ok_or(DecodeError::Timestamp(created))?
            .format(REVIEW_DATE_FORMAT)
            .to_string();

        Ok(Self {
            title: REVIEW_TITLE,
            body: body_or_space(&review.review.body),
            rating: review.review.rating,
            review_date,
            reviewer_name: review.reviewer_name().to_string(),
            reviewer_email: review.reviewer_email().unwrap_or_default().to_string(),
            product_id: product.map(ProductRef::legacy_id).transpose()?,
            product_handle: product.map(|p| p.handle.clone()).unwrap_or_default(),
            reply: "",
            picture_urls: review.review.image_url.clone().unwrap_or_default(),
        })
    }
}
