//! Etsy active listings rendered as rows of a Facebook catalog import.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DecodeError;
use crate::money::{Money, format_amount};

/// Column order of the catalog import file.
pub const CATALOG_HEADER: [&str; 8] = [
    "id",
    "title",
    "description",
    "availability",
    "price",
    "image_link",
    "additional_image_link",
    "inventory",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtsyListingState {
    Active,
    Inactive,
    SoldOut,
    Draft,
    Expired,
    Removed,
    Private,
    Unavailable,
    #[serde(other)]
    Other,
}

/// Facebook's `availability` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    #[serde(rename = "in stock")]
    InStock,
    #[serde(rename = "out of stock")]
    OutOfStock,
    #[serde(rename = "preorder")]
    Preorder,
    #[serde(rename = "available for order")]
    AvailableForOrder,
    #[serde(rename = "discontinued")]
    Discontinued,
}

impl From<EtsyListingState> for Availability {
    fn from(state: EtsyListingState) -> Self {
        match state {
            EtsyListingState::Active => Availability::InStock,
            EtsyListingState::SoldOut => Availability::OutOfStock,
            EtsyListingState::Expired => Availability::AvailableForOrder,
            EtsyListingState::Draft | EtsyListingState::Private => Availability::Preorder,
            EtsyListingState::Inactive
            | EtsyListingState::Removed
            | EtsyListingState::Unavailable
            | EtsyListingState::Other => Availability::Discontinued,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingImage {
    pub url_fullxfull: String,
    #[serde(default)]
    pub rank: u32,
}

/// An Etsy listing fetched with its images.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EtsyListing {
    pub listing_id: u64,
    pub state: EtsyListingState,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub quantity: i64,
    pub price: Money,
    #[serde(default)]
    pub skus: Vec<String>,
    #[serde(default)]
    pub images: Vec<ListingImage>,
}

impl EtsyListing {
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(serde_json::from_value(value)?)
    }

    /// First non-blank SKU. The catalog keys products by SKU so the same
    /// item lines up across shops.
    pub fn sku(&self) -> Option<&str> {
        self.skus.iter().map(|s| s.trim()).find(|s| !s.is_empty())
    }

    /// Image URLs, primary first.
    pub fn image_urls(&self) -> Vec<&str> {
        let mut images: Vec<&ListingImage> = self.images.iter().collect();
        images.sort_by_key(|i| i.rank);
        images.iter().map(|i| i.url_fullxfull.as_str()).collect()
    }
}

/// One product row of the catalog import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub availability: Availability,
    /// Amount and ISO currency, e.g. `24.00 USD`.
    pub price: String,
    pub image_link: String,
    /// Remaining images, comma separated.
    pub additional_image_link: String,
    pub inventory: i64,
}

impl CatalogRow {
    /// `Ok(None)` when the listing has no SKU to key the row by.
    pub fn build(listing: &EtsyListing) -> Result<Option<Self>, DecodeError> {
        let Some(sku) = listing.sku() else {
            return Ok(None);
        };
        let price = format!(
            "{} {}",
            format_amount(listing.price.to_f64()?),
            listing.price.currency_code
        );
        let images = listing.image_urls();
        let (primary, rest) = images.split_first().map_or(("", &[][..]), |(p, r)| (*p, r));

        Ok(Some(Self {
            id: sku.to_string(),
            title: listing.title.clone(),
            description: listing.description.clone(),
            availability: listing.state.into(),
            price,
            image_link: primary.to_string(),
            additional_image_link: rest.join(","),
            inventory: listing.quantity,
        }))
    }
}
