//! Trigger handling: pick the passes a run performs, run them, and alert
//! when a run fails outright.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Utc;
use lazyboost_core::SyncWindow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::{Alerter, EtsyApi, ReviewPlatform, ShopifyApi};
use crate::error::SyncError;
use crate::handlers::{
    CatalogExporter, ListingHandler, OrderHandler, ReviewExporter, ReviewHandler, SyncReport,
};

/// What a trigger asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    OrderSync,
    ReviewSync,
    ListingSync,
    /// Orders, then reviews.
    Sync,
    ReviewExport,
    /// Active Etsy listings to a Facebook catalog CSV.
    FacebookExport,
}

impl Task {
    pub const ALL: [Task; 6] = [
        Task::OrderSync,
        Task::ReviewSync,
        Task::ListingSync,
        Task::Sync,
        Task::ReviewExport,
        Task::FacebookExport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Task::OrderSync => "order_sync",
            Task::ReviewSync => "review_sync",
            Task::ListingSync => "listing_sync",
            Task::Sync => "sync",
            Task::ReviewExport => "review_export",
            Task::FacebookExport => "facebook_export",
        }
    }

    /// Read the task from a trigger event of the form `{"task": "..."}`.
    pub fn from_event(event: &Value) -> Result<Self, SyncError> {
        let task = event
            .get("task")
            .ok_or_else(|| SyncError::Event("missing \"task\" field".into()))?
            .as_str()
            .ok_or_else(|| SyncError::Event("\"task\" must be a string".into()))?;
        task.parse()
    }
}

impl FromStr for Task {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SyncError::UnknownTask(s.to_string()))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookback windows and output locations for a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub order_lookback_min: u32,
    pub review_lookback_min: u32,
    pub listing_lookback_min: u32,
    pub export_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            order_lookback_min: 20,
            review_lookback_min: 17,
            listing_lookback_min: 17,
            export_path: PathBuf::from("etsy_reviews.csv"),
            catalog_path: PathBuf::from("lazyboost-facebook-import.csv"),
        }
    }
}

/// Reports of the passes a run performed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub orders: Option<SyncReport>,
    pub reviews: Option<SyncReport>,
    pub listings: Option<SyncReport>,
    pub catalog: Option<SyncReport>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        [self.orders, self.reviews, self.listings, self.catalog]
            .iter()
            .flatten()
            .map(|r| r.failed)
            .sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("orders", self.orders),
            ("reviews", self.reviews),
            ("listings", self.listings),
            ("catalog", self.catalog),
        ]
        .into_iter()
        .filter_map(|(name, report)| report.map(|r| format!("{name}: {r}")))
        .collect();
        f.write_str(&parts.join("; "))
    }
}

pub struct TaskRunner<'a> {
    etsy: &'a dyn EtsyApi,
    shopify: &'a dyn ShopifyApi,
    reviews: Option<&'a dyn ReviewPlatform>,
    alerter: Option<&'a dyn Alerter>,
    config: RunConfig,
}

impl<'a> TaskRunner<'a> {
    pub fn new(etsy: &'a dyn EtsyApi, shopify: &'a dyn ShopifyApi, config: RunConfig) -> Self {
        Self {
            etsy,
            shopify,
            reviews: None,
            alerter: None,
            config,
        }
    }

    pub fn with_review_platform(mut self, platform: &'a dyn ReviewPlatform) -> Self {
        self.reviews = Some(platform);
        self
    }

    pub fn with_alerter(mut self, alerter: &'a dyn Alerter) -> Self {
        self.alerter = Some(alerter);
        self
    }

    /// Run `task`. A fatal error is sent to the alerter, when there is one,
    /// and returned either way.
    pub async fn run(&self, task: Task) -> Result<RunSummary, SyncError> {
        info!(task = %task, "run started");
        match self.dispatch(task).await {
            Ok(summary) => {
                info!(task = %task, %summary, "run finished");
                Ok(summary)
            }
            Err(e) => {
                error!(task = %task, error = %e, "run failed");
                self.alert(&e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Report a failure that happened before a run could start.
    pub async fn alert(&self, message: &str) {
        let Some(alerter) = self.alerter else {
            warn!("no alert channel configured");
            return;
        };
        if let Err(e) = alerter.notify(message, Utc::now()).await {
            error!(error = %e, "could not deliver failure alert");
        }
    }

    async fn dispatch(&self, task: Task) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::default();
        match task {
            Task::OrderSync => summary.orders = Some(self.orders().await?),
            Task::ReviewSync => summary.reviews = Some(self.reviews().await?),
            Task::ListingSync => summary.listings = Some(self.listings().await?),
            Task::Sync => {
                summary.orders = Some(self.orders().await?);
                summary.reviews = Some(self.reviews().await?);
            }
            Task::ReviewExport => summary.reviews = Some(self.export().await?),
            Task::FacebookExport => summary.catalog = Some(self.catalog().await?),
        }
        Ok(summary)
    }

    async fn orders(&self) -> Result<SyncReport, SyncError> {
        let window = SyncWindow::last_minutes(self.config.order_lookback_min);
        OrderHandler::new(self.etsy, self.shopify).run(&window).await
    }

    async fn reviews(&self) -> Result<SyncReport, SyncError> {
        let platform = self
            .reviews
            .ok_or(SyncError::NotConfigured("review platform"))?;
        let window = SyncWindow::last_minutes(self.config.review_lookback_min);
        ReviewHandler::new(self.etsy, self.shopify, platform)
            .run(&window)
            .await
    }

    async fn listings(&self) -> Result<SyncReport, SyncError> {
        let window = SyncWindow::last_minutes(self.config.listing_lookback_min);
        ListingHandler::new(self.etsy, self.shopify).run(&window).await
    }

    async fn export(&self) -> Result<SyncReport, SyncError> {
        let window = SyncWindow::last_minutes(self.config.review_lookback_min);
        let path = &self.config.export_path;
        let file = BufWriter::new(File::create(path)?);
        let report = ReviewExporter::new(self.etsy, self.shopify)
            .run(&window, file)
            .await?;
        info!(path = %path.display(), rows = report.synced, "wrote review export");
        Ok(report)
    }

    async fn catalog(&self) -> Result<SyncReport, SyncError> {
        let path = &self.config.catalog_path;
        let file = BufWriter::new(File::create(path)?);
        let report = CatalogExporter::new(self.etsy).run(file).await?;
        info!(path = %path.display(), rows = report.synced, "wrote facebook catalog");
        Ok(report)
    }
}
