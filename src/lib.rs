//! santech.ru catalog crawler
//!
//! Crawls every configured city storefront of santech.ru, extracts product
//! records (one per product, or one per variant on variant-table pages),
//! stores them per city in SQLite and exports everything to JSON.

pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use anyhow::{Context, Result};
use std::sync::Arc;

use application::{CityCrawler, CrawlSettings, MultiCityDriver, RunSummary};
use infrastructure::{AppConfig, PageFetcher, ParsingConfig, ProductStore, ReportsLayout};

/// Run a full crawl of every configured city with the given fetcher.
///
/// Fails before any city starts when the reports folder cannot be prepared.
pub async fn run_crawl(config: &AppConfig, fetcher: Arc<dyn PageFetcher>) -> Result<RunSummary> {
    let layout = ReportsLayout::from_config(&config.storage);
    layout
        .ensure()
        .await
        .with_context(|| format!("Reports folder {:?} is not available", layout.root()))?;

    let store = Arc::new(ProductStore::new(layout));
    let crawler = CityCrawler::new(
        fetcher,
        store.clone(),
        &ParsingConfig::default(),
        CrawlSettings::from_config(&config.crawler),
    )
    .context("Failed to build parsers")?;

    let driver = MultiCityDriver::new(Arc::new(crawler), store, config.crawler.city_concurrency);
    let summary = driver
        .run(&config.crawler.cities())
        .await
        .context("Failed to export reports")?;

    Ok(summary)
}
