mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use lazyboost_sync::{
    Alerter, EtsyClient, FileSecretStore, JudgeMeClient, ReviewPlatform, RunConfig, SecretStore,
    ShopifyClient, StampedClient, Task, TaskRunner, WebhookAlerter,
};
use tracing::{error, info};

/// Reconcile orders, listings and reviews between Etsy and Shopify.
#[derive(Parser)]
#[command(name = "lazyboost", version, about, long_about = None)]
struct Cli {
    /// JSON file holding API keys and OAuth tokens. Rotated Etsy tokens are
    /// written back to it.
    #[arg(long, env = "LAZYBOOST_SECRETS", default_value = "secrets.json", global = true)]
    secrets: PathBuf,

    #[arg(
        long,
        env = "SYNC_INTERVAL_ORDERS_MIN",
        default_value_t = 20,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    order_lookback_min: u32,

    #[arg(
        long,
        env = "SYNC_INTERVAL_REVIEWS_MIN",
        default_value_t = 17,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    review_lookback_min: u32,

    #[arg(
        long,
        env = "SYNC_INTERVAL_LISTINGS_MIN",
        default_value_t = 17,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    listing_lookback_min: u32,

    /// Webhook that receives an alert when a run fails.
    #[arg(long, env = "LAZYBOOST_ALERT_WEBHOOK", global = true)]
    alert_webhook: Option<String>,

    #[arg(long, env = "LAZYBOOST_HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    http_timeout_secs: u64,

    #[arg(
        long,
        env = "LAZYBOOST_REVIEW_PLATFORM",
        value_enum,
        default_value_t = ReviewTarget::Judgeme,
        global = true
    )]
    review_platform: ReviewTarget,

    /// Log JSON lines instead of human-readable text.
    #[arg(long, env = "LAZYBOOST_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one task: order_sync, review_sync, listing_sync, sync, review_export
    /// or facebook_export
    Run { task: Task },

    /// Run the task named by a trigger event, e.g. '{"task": "sync"}'
    Event { payload: String },

    /// Write recent Etsy reviews to a Judge.me import CSV
    ExportReviews {
        #[arg(long, default_value = "etsy_reviews.csv")]
        out: PathBuf,
    },

    /// Write active Etsy listings to a Facebook catalog import CSV
    ExportFacebook {
        #[arg(long, default_value = "lazyboost-facebook-import.csv")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReviewTarget {
    Judgeme,
    Stamped,
}

/// Live clients for one run.
struct Clients {
    etsy: EtsyClient,
    shopify: ShopifyClient,
    reviews: Option<Box<dyn ReviewPlatform>>,
}

impl Clients {
    async fn connect(cli: &Cli, task: Task, timeout: Duration) -> anyhow::Result<Self> {
        let secrets: Arc<dyn SecretStore> = Arc::new(
            FileSecretStore::load(&cli.secrets)
                .await
                .with_context(|| format!("loading secrets from {}", cli.secrets.display()))?,
        );

        let etsy = EtsyClient::from_secrets(secrets.clone(), timeout)
            .await
            .context("configuring etsy client")?;
        let shopify = ShopifyClient::from_secrets(secrets.clone(), timeout)
            .await
            .context("configuring shopify client")?;

        let reviews = match task {
            Task::ReviewSync | Task::Sync => Some(
                review_platform(cli.review_platform, secrets, shopify.shop_domain(), timeout)
                    .await?,
            ),
            _ => None,
        };

        Ok(Self {
            etsy,
            shopify,
            reviews,
        })
    }
}

async fn review_platform(
    target: ReviewTarget,
    secrets: Arc<dyn SecretStore>,
    shop_domain: &str,
    timeout: Duration,
) -> anyhow::Result<Box<dyn ReviewPlatform>> {
    let platform: Box<dyn ReviewPlatform> = match target {
        ReviewTarget::Judgeme => Box::new(
            JudgeMeClient::from_secrets(secrets, shop_domain, timeout)
                .await
                .context("configuring judge.me client")?,
        ),
        ReviewTarget::Stamped => Box::new(
            StampedClient::from_secrets(secrets, timeout)
                .await
                .context("configuring stamped.io client")?,
        ),
    };
    Ok(platform)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init("info", cli.json)?;
    info!(version = env!("CARGO_PKG_VERSION"), "lazyboost starting");

    let timeout = Duration::from_secs(cli.http_timeout_secs);
    let alerter = cli
        .alert_webhook
        .as_deref()
        .map(|url| WebhookAlerter::new(url, timeout))
        .transpose()
        .context("configuring alert webhook")?;

    let mut config = RunConfig {
        order_lookback_min: cli.order_lookback_min,
        review_lookback_min: cli.review_lookback_min,
        listing_lookback_min: cli.listing_lookback_min,
        ..RunConfig::default()
    };
    let task = match &cli.command {
        Command::Run { task } => *task,
        Command::Event { payload } => {
            let event: serde_json::Value =
                serde_json::from_str(payload).context("trigger event is not JSON")?;
            Task::from_event(&event).context("rejected trigger event")?
        }
        Command::ExportReviews { out } => {
            config.export_path = out.clone();
            Task::ReviewExport
        }
        Command::ExportFacebook { out } => {
            config.catalog_path = out.clone();
            Task::FacebookExport
        }
    };

    let clients = match Clients::connect(&cli, task, timeout).await {
        Ok(clients) => clients,
        Err(e) => {
            error!(task = %task, error = %format!("{e:#}"), "setup failed");
            let message = format!("{e:#}");
            if let Some(alerter) = &alerter
                && let Err(alert_err) = alerter.notify(&message, chrono::Utc::now()).await
            {
                error!(error = %alert_err, "could not deliver failure alert");
            }
            return Err(e);
        }
    };

    let mut runner = TaskRunner::new(&clients.etsy, &clients.shopify, config);
    if let Some(platform) = clients.reviews.as_deref() {
        runner = runner.with_review_platform(platform);
    }
    if let Some(alerter) = &alerter {
        runner = runner.with_alerter(alerter as &dyn Alerter);
    }

    let summary = runner
        .run(task)
        .await
        .with_context(|| format!("{task} failed"))?;
    println!("{task}: {summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookbacks_default_to_schedule() {
        let cli = Cli::try_parse_from(["lazyboost", "run", "sync"]).unwrap();
        assert_eq!(cli.order_lookback_min, 20);
        assert_eq!(cli.review_lookback_min, 17);
        assert_eq!(cli.listing_lookback_min, 17);
        assert!(matches!(cli.command, Command::Run { task: Task::Sync }));
    }

    #[test]
    fn lookbacks_must_be_positive_minutes() {
        for bad in ["0", "-5", "99999999999"] {
            let parsed =
                Cli::try_parse_from(["lazyboost", "--order-lookback-min", bad, "run", "sync"]);
            assert!(parsed.is_err(), "accepted lookback {bad}");
        }
        let cli = Cli::try_parse_from(["lazyboost", "run", "sync", "--review-lookback-min", "60"])
            .unwrap();
        assert_eq!(cli.review_lookback_min, 60);
    }

    #[test]
    fn export_facebook_takes_output_path() {
        let cli = Cli::try_parse_from(["lazyboost", "export-facebook", "--out", "fb.csv"]).unwrap();
        match cli.command {
            Command::ExportFacebook { out } => assert_eq!(out, PathBuf::from("fb.csv")),
            _ => panic!("expected export-facebook"),
        }
    }
}
