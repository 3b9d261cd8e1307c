//! Multi-city run: purge the previous reports, crawl every city on a bounded
//! pool, then export all stores to JSON once.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::application::crawl_orchestrator::{CityCrawlReport, CityCrawler};
use crate::domain::catalog::City;
use crate::infrastructure::product_store::{ProductStore, StorageError};

/// What a full run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<CityCrawlReport>,
    /// Records in the aggregate export
    pub total_count: usize,
}

impl RunSummary {
    pub fn failed_cities(&self) -> impl Iterator<Item = &CityCrawlReport> {
        self.reports.iter().filter(|report| !report.succeeded())
    }
}

pub struct MultiCityDriver {
    crawler: Arc<CityCrawler>,
    store: Arc<ProductStore>,
    city_concurrency: usize,
}

impl MultiCityDriver {
    pub fn new(crawler: Arc<CityCrawler>, store: Arc<ProductStore>, city_concurrency: usize) -> Self {
        Self {
            crawler,
            store,
            city_concurrency: city_concurrency.max(1),
        }
    }

    pub async fn run(&self, cities: &[City]) -> Result<RunSummary, StorageError> {
        let removed = self.store.purge_old_artifacts(cities).await;
        info!("Removed {} old report file(s)", removed);

        let reports = self.crawl_cities(cities).await;
        for report in reports.iter().filter(|report| !report.succeeded()) {
            warn!("({}) City failed: {}", report.city, report.error.as_deref().unwrap_or("unknown error"));
        }

        let total_count = self.store.export_all(cities).await?;
        self.store.close().await;

        Ok(RunSummary { reports, total_count })
    }

    async fn crawl_cities(&self, cities: &[City]) -> Vec<CityCrawlReport> {
        let semaphore = Arc::new(Semaphore::new(self.city_concurrency));
        let mut tasks = Vec::with_capacity(cities.len());

        for city in cities.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let crawler = Arc::clone(&self.crawler);
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return CityCrawlReport::failed(&city, "city pool closed"),
                };
                crawler.crawl_city(&city).await
            }));
        }

        join_all(tasks)
            .await
            .into_iter()
            .zip(cities)
            .map(|(result, city)| match result {
                Ok(report) => report,
                Err(e) => {
                    warn!("❌ ({}) City task join failed: {}", city, e);
                    CityCrawlReport::failed(city, format!("task failed: {e}"))
                }
            })
            .collect()
    }
}
