use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use santech_crawler::infrastructure::logging::{bootstrap_logging, init_logging_with_config, log_system_info};
use santech_crawler::infrastructure::{ConfigManager, HttpClient, HttpClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = {
        let _bootstrap = bootstrap_logging();
        ConfigManager::new()?.load_config().await?
    };

    init_logging_with_config(&config.logging)?;
    log_system_info();

    let client = HttpClient::with_config(HttpClientConfig::from_http_config(&config.http))
        .context("Failed to create HTTP client")?;

    info!("Crawling {} cities", config.crawler.cities.len());
    let summary = santech_crawler::run_crawl(&config, Arc::new(client)).await?;

    let failed = summary.failed_cities().count();
    if failed > 0 {
        info!("{} of {} cities failed", failed, summary.reports.len());
    }

    println!("Total count: {}", summary.total_count);
    Ok(())
}
