use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hashtag_harvester::browser::{ChromiumDriver, DriverConfig};
use hashtag_harvester::config::Config;
use hashtag_harvester::db::{count_posts, Database, RecordSink};
use hashtag_harvester::extract::ExtractionSession;
use hashtag_harvester::pacing::{Pacer, Pause, RandomPacer};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting hashtag-harvester");

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        keywords = ?config.keywords,
        max_items = config.max_items,
        max_scrolls = config.max_scrolls,
        min_recent_hours = config.min_recent_hours,
        "Configuration loaded"
    );

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let driver = ChromiumDriver::launch(&DriverConfig::from(&config))
        .await
        .context("Failed to start browser")?;
    let pacer = RandomPacer;
    let mut session =
        ExtractionSession::with_search_url_template(driver, pacer, &config.search_url_template);

    let (collected, inserted) = scrape_all(&config, &mut session, &db).await;
    session.close().await;

    let total = count_posts(db.pool()).await?;
    info!(collected, inserted, total_stored = total, "Run complete");

    Ok(())
}

/// Scrape every keyword in turn, handing each batch to the sink.
async fn scrape_all(
    config: &Config,
    session: &mut ExtractionSession<ChromiumDriver, RandomPacer>,
    sink: &impl RecordSink,
) -> (usize, usize) {
    let limits = config.limits();
    let between_queries = Pause::new(config.query_pause, std::time::Duration::from_secs(1));
    let mut collected = 0;
    let mut inserted = 0;

    for (i, keyword) in config.keywords.iter().enumerate() {
        info!(keyword = %keyword, "Scraping keyword");
        let records = session.scrape_hashtag(keyword, limits).await;
        collected += records.len();

        if records.is_empty() {
            warn!(keyword = %keyword, "No records collected");
        } else {
            match sink.accept(keyword, &records).await {
                Ok(report) => {
                    inserted += report.inserted;
                    info!(
                        keyword = %keyword,
                        received = report.received,
                        inserted = report.inserted,
                        duplicates = report.duplicates,
                        "Stored records"
                    );
                }
                Err(e) => error!(keyword = %keyword, "Failed to store records: {e:#}"),
            }
        }

        if i + 1 < config.keywords.len() {
            session.pacer().delay(between_queries).await;
        }
    }

    (collected, inserted)
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hashtag_harvester=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
