//! Etsy reviews → Judge.me / Stamped.io, or a Judge.me import CSV.

use std::io::Write;

use lazyboost_core::{
    CSV_HEADER, EnrichedReview, MappingError, ProductRef, Review, ReviewCsvRow, SyncWindow,
};
use serde_json::Value;
use tracing::{error, info, warn};

use super::{SyncReport, raw_id};
use crate::api::{EtsyApi, ReviewPlatform, ShopifyApi};
use crate::error::SyncError;

/// Resolve a review's transaction, then the receipt it belongs to.
pub async fn enrich(etsy: &dyn EtsyApi, review: Review) -> Result<EnrichedReview, SyncError> {
    let transaction = etsy
        .transaction(review.transaction_id)
        .await
        .map_err(SyncError::Etsy)?;
    let order = etsy
        .receipt(transaction.receipt_id)
        .await
        .map_err(SyncError::Etsy)?;
    Ok(review.enrich(transaction, order))
}

/// Decode and enrich one raw review. `Ok(None)` means the review has no
/// SKU and cannot be matched to a product.
async fn prepare(
    etsy: &dyn EtsyApi,
    value: Value,
) -> Result<Option<(EnrichedReview, String)>, SyncError> {
    let review = Review::from_value(value)?;
    let enriched = enrich(etsy, review).await?;
    match enriched.sku() {
        Ok(sku) => {
            let sku = sku.to_string();
            Ok(Some((enriched, sku)))
        }
        Err(e) => {
            warn!(
                transaction_id = enriched.review.transaction_id,
                reason = %e,
                "review has no SKU, skipping"
            );
            Ok(None)
        }
    }
}

pub struct ReviewHandler<'a> {
    etsy: &'a dyn EtsyApi,
    shopify: &'a dyn ShopifyApi,
    platform: &'a dyn ReviewPlatform,
}

impl<'a> ReviewHandler<'a> {
    pub fn new(
        etsy: &'a dyn EtsyApi,
        shopify: &'a dyn ShopifyApi,
        platform: &'a dyn ReviewPlatform,
    ) -> Self {
        Self {
            etsy,
            shopify,
            platform,
        }
    }

    pub async fn run(&self, window: &SyncWindow) -> Result<SyncReport, SyncError> {
        let reviews = self.etsy.reviews(window).await.map_err(SyncError::Etsy)?;

        let mut report = SyncReport::default();
        for value in reviews {
            let transaction_id = raw_id(&value, "transaction_id");
            match self.sync_review(value).await {
                Ok(true) => report.synced += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    error!(
                        transaction_id = %transaction_id,
                        platform = self.platform.name(),
                        operation = "review_sync",
                        error = %e,
                        "review sync failed"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            %report,
            total = report.total(),
            platform = self.platform.name(),
            "review sync finished"
        );
        Ok(report)
    }

    /// `Ok(false)` when the review was skipped.
    async fn sync_review(&self, value: Value) -> Result<bool, SyncError> {
        let Some((review, sku)) = prepare(self.etsy, value).await? else {
            return Ok(false);
        };

        let product = self
            .shopify
            .product_by_sku(&sku)
            .await
            .map_err(SyncError::Shopify)?
            .ok_or_else(|| MappingError::UnresolvedProduct(sku.clone()))?;

        let payload = self
            .platform
            .payload(&review, &product, &sku)
            .map_err(SyncError::ReviewPlatform)?;
        self.platform
            .post(&payload)
            .await
            .map_err(SyncError::ReviewPlatform)?;
        info!(
            transaction_id = review.review.transaction_id,
            sku = %sku,
            rating = review.review.rating,
            "posted review"
        );
        Ok(true)
    }
}

/// Writes reviews as a Judge.me import CSV instead of posting them.
pub struct ReviewExporter<'a> {
    etsy: &'a dyn EtsyApi,
    shopify: &'a dyn ShopifyApi,
}

impl<'a> ReviewExporter<'a> {
    pub fn new(etsy: &'a dyn EtsyApi, shopify: &'a dyn ShopifyApi) -> Self {
        Self { etsy, shopify }
    }

    /// Reviews whose product cannot be found are still written, with blank
    /// product columns.
    pub async fn run<W: Write>(
        &self,
        window: &SyncWindow,
        out: W,
    ) -> Result<SyncReport, SyncError> {
        let reviews = self.etsy.reviews(window).await.map_err(SyncError::Etsy)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(CSV_HEADER)?;

        let mut report = SyncReport::default();
        for value in reviews {
            let transaction_id = raw_id(&value, "transaction_id");
            match self.row(value).await {
                Ok(Some(row)) => {
                    writer.serialize(row)?;
                    report.synced += 1;
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    error!(
                        transaction_id = %transaction_id,
                        operation = "review_export",
                        error = %e,
                        "review export failed"
                    );
                    report.failed += 1;
                }
            }
        }
        writer.flush()?;

        info!(%report, total = report.total(), "review export finished");
        Ok(report)
    }

    async fn row(&self, value: Value) -> Result<Option<ReviewCsvRow>, SyncError> {
        let Some((review, sku)) = prepare(self.etsy, value).await? else {
            return Ok(None);
        };
        let product: Option<ProductRef> = self
            .shopify
            .product_by_sku(&sku)
            .await
            .map_err(SyncError::Shopify)?;
        if product.is_none() {
            warn!(sku = %sku, "no shopify product for review, leaving product columns blank");
        }
        Ok(Some(ReviewCsvRow::build(&review, product.as_ref())?))
    }
}
