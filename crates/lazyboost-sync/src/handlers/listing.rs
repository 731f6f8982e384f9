//! Shopify products → Etsy draft listings.

use lazyboost_core::{ListingDraft, ListingStatus, SyncWindow};
use tracing::{debug, error, info, warn};

use super::SyncReport;
use crate::api::{EtsyApi, ShopifyApi};
use crate::error::SyncError;

pub struct ListingHandler<'a> {
    etsy: &'a dyn EtsyApi,
    shopify: &'a dyn ShopifyApi,
}

impl<'a> ListingHandler<'a> {
    pub fn new(etsy: &'a dyn EtsyApi, shopify: &'a dyn ShopifyApi) -> Self {
        Self { etsy, shopify }
    }

    /// Push each variant changed inside `window` to Etsy as a new draft
    /// listing. Existing Etsy listings are never updated or removed.
    ///
    /// `synced` and `failed` count variants; `skipped` counts listings with
    /// nothing eligible.
    pub async fn run(&self, window: &SyncWindow) -> Result<SyncReport, SyncError> {
        let listings = self
            .shopify
            .updated_listings(window.start)
            .await
            .map_err(SyncError::Shopify)?;

        let mut report = SyncReport::default();
        for listing in &listings {
            if listing.status != ListingStatus::Active {
                debug!(product_id = %listing.id, status = ?listing.status, "not active, skipping");
                report.skipped += 1;
                continue;
            }
            if listing.total_inventory < 1 {
                warn!(product_id = %listing.id, "inventory is 0, skipping");
                report.skipped += 1;
                continue;
            }

            let eligible = listing.eligible_variants(window);
            if eligible.is_empty() {
                debug!(product_id = %listing.id, "no variant changed in window");
                report.skipped += 1;
                continue;
            }

            for variant in eligible {
                let draft = match ListingDraft::build(listing, variant) {
                    Ok(draft) => draft,
                    Err(e) => {
                        error!(
                            product_id = %listing.id,
                            variant_id = %variant.id,
                            product_type = %listing.product_type,
                            error = %e,
                            "cannot map listing for etsy"
                        );
                        report.failed += 1;
                        continue;
                    }
                };

                match self.etsy.create_listing(&draft).await {
                    Ok(listing_id) => {
                        info!(variant_id = %variant.id, listing_id, "pushed variant to etsy");
                        report.synced += 1;
                    }
                    Err(e) => {
                        error!(
                            variant_id = %variant.id,
                            platform = "etsy",
                            operation = "create_listing",
                            error = %e,
                            "listing push failed"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        info!(%report, total = report.total(), "listing sync finished");
        Ok(report)
    }
}
