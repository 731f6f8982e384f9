//! Etsy active listings → Facebook catalog import CSV.

use std::io::Write;

use lazyboost_core::{CATALOG_HEADER, CatalogRow, EtsyListing};
use serde_json::Value;
use tracing::{error, info, warn};

use super::{SyncReport, raw_id};
use crate::api::EtsyApi;
use crate::error::SyncError;

pub struct CatalogExporter<'a> {
    etsy: &'a dyn EtsyApi,
}

impl<'a> CatalogExporter<'a> {
    pub fn new(etsy: &'a dyn EtsyApi) -> Self {
        Self { etsy }
    }

    /// Rows are written sorted by SKU so successive exports diff cleanly.
    pub async fn run<W: Write>(&self, out: W) -> Result<SyncReport, SyncError> {
        let listings = self.etsy.active_listings().await.map_err(SyncError::Etsy)?;

        let mut report = SyncReport::default();
        let mut rows = Vec::with_capacity(listings.len());
        for value in listings {
            let listing_id = raw_id(&value, "listing_id");
            match row(value) {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {
                    warn!(listing_id = %listing_id, "listing has no SKU, skipping");
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(
                        listing_id = %listing_id,
                        operation = "facebook_export",
                        error = %e,
                        "catalog row failed"
                    );
                    report.failed += 1;
                }
            }
        }
        rows.sort_by(|a, b| a.id.cmp(&b.id));

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(CATALOG_HEADER)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        report.synced = rows.len();

        info!(%report, total = report.total(), "catalog export finished");
        Ok(report)
    }
}

fn row(value: Value) -> Result<Option<CatalogRow>, SyncError> {
    let listing = EtsyListing::from_value(value)?;
    Ok(CatalogRow::build(&listing)?)
}
