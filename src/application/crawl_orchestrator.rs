//! Per-city crawl: catalog → category → sub-subcategory listing (with
//! pagination) → concurrent product extraction → dedup → one stored batch per
//! sub-subcategory.
//!
//! Fetch failures below the catalog root are skipped after a fixed pause.
//! Only a failed catalog discovery or a storage failure aborts the city.

use anyhow::Context;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::application::product_extractor::ProductExtractor;
use crate::domain::catalog::{CatalogLink, City};
use crate::domain::constants::site;
use crate::domain::product_record::{ProductRecord, SeenProducts};
use crate::domain::repositories::ProductBatchRepository;
use crate::infrastructure::config::CrawlerConfig;
use crate::infrastructure::html_node::PageDocument;
use crate::infrastructure::parsing::{
    CatalogParser, ListingPage, ParseContext, ParsingConfig, ParsingError, ParsingResult, ProductPageParser,
};
use crate::infrastructure::simple_http_client::{FetchError, PageFetcher};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParsingError,
    },

    #[error("No categories left after excluding '{excluded}'")]
    NoCategories { excluded: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Outcome of one city run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CityCrawlReport {
    pub city: String,
    pub categories: usize,
    pub subcategories_visited: usize,
    pub pages_failed: usize,
    pub products_saved: usize,
    /// Set when the city was aborted
    pub error: Option<String>,
}

impl CityCrawlReport {
    pub fn new(city: &City) -> Self {
        Self {
            city: city.slug.clone(),
            ..Default::default()
        }
    }

    pub fn failed(city: &City, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(city)
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Crawl behaviour shared by every city
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub domain: String,
    pub root_city: String,
    pub excluded_category: String,
    pub product_concurrency: usize,
    pub failure_pause: Duration,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            domain: config.domain.trim_end_matches('/').to_string(),
            root_city: config.root_city.clone(),
            excluded_category: config.excluded_category.clone(),
            product_concurrency: config.product_concurrency.max(1),
            failure_pause: Duration::from_millis(config.failure_pause_ms),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

pub struct CityCrawler {
    fetcher: Arc<dyn PageFetcher>,
    repository: Arc<dyn ProductBatchRepository>,
    catalog_parser: CatalogParser,
    extractor: Arc<ProductExtractor>,
    settings: CrawlSettings,
}

impl CityCrawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        repository: Arc<dyn ProductBatchRepository>,
        parsing: &ParsingConfig,
        settings: CrawlSettings,
    ) -> ParsingResult<Self> {
        let catalog_parser = CatalogParser::with_config(&parsing.catalog_selectors)?;
        let product_parser = ProductPageParser::with_config(&parsing.product_page_selectors)?;
        let extractor = Arc::new(ProductExtractor::new(
            Arc::clone(&fetcher),
            product_parser,
            settings.domain.clone(),
        ));

        Ok(Self {
            fetcher,
            repository,
            catalog_parser,
            extractor,
            settings,
        })
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Category links of the storefront at `base_url`, promo category included
    pub async fn discover_categories(&self, base_url: &str) -> Result<Vec<CatalogLink>, CrawlError> {
        let catalog_url = format!("{}{}", base_url.trim_end_matches('/'), site::CATALOG_PATH);
        let body = self.fetcher.fetch(&catalog_url).await?;
        self.parse_page(&body, &catalog_url, |document, context| {
            self.catalog_parser.parse_category_links(document, context)
        })
    }

    /// Crawl one city. Never fails: an aborted city comes back as a failed report.
    pub async fn crawl_city(&self, city: &City) -> CityCrawlReport {
        let mut report = CityCrawlReport::new(city);
        match self.run(city, &mut report).await {
            Ok(()) => info!(
                "({}) Done: {} categories, {} sub-subcategories, {} pages failed, {} products saved",
                city, report.categories, report.subcategories_visited, report.pages_failed, report.products_saved
            ),
            Err(e) => {
                error!("({}) Crawl aborted: {:#}", city, e);
                report.error = Some(format!("{e:#}"));
            }
        }
        report
    }

    async fn run(&self, city: &City, report: &mut CityCrawlReport) -> Result<(), CrawlError> {
        let base_url = city.base_url(&self.settings.domain, &self.settings.root_city);

        info!("({}) Parse links to categories from the main catalog...", city);
        let categories: Vec<CatalogLink> = self
            .discover_categories(&base_url)
            .await?
            .into_iter()
            .filter(|link| link.text.trim() != self.settings.excluded_category)
            .collect();
        if categories.is_empty() {
            return Err(CrawlError::NoCategories {
                excluded: self.settings.excluded_category.clone(),
            });
        }
        report.categories = categories.len();
        info!("({}) Done! Found {} links to product categories.", city, categories.len());

        let mut seen = SeenProducts::new();
        for category in &categories {
            let body = match self.fetcher.fetch(&category.url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("({}) Category skipped: {}", city, e);
                    report.pages_failed += 1;
                    self.pause().await;
                    continue;
                }
            };

            let subcategories = match self.parse_page(&body, &category.url, |document, context| {
                self.catalog_parser.parse_subcategory_links(document, context)
            }) {
                Ok(links) => links,
                Err(e) => {
                    warn!("({}) Category skipped: {}", city, e);
                    continue;
                }
            };
            info!("({}) {}: {} sub-subcategories", city, category.text, subcategories.len());

            for subcategory in &subcategories {
                report.subcategories_visited += 1;
                let saved = self.crawl_subcategory(city, subcategory, &mut seen, report).await?;
                report.products_saved += saved;
            }
        }

        Ok(())
    }

    /// Crawl one sub-subcategory listing and store its new products.
    /// Returns the number of records written.
    async fn crawl_subcategory(
        &self,
        city: &City,
        subcategory: &CatalogLink,
        seen: &mut SeenProducts,
        report: &mut CityCrawlReport,
    ) -> Result<usize, CrawlError> {
        let body = match self.fetcher.fetch(&subcategory.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("({}) Sub-subcategory skipped: {}", city, e);
                report.pages_failed += 1;
                self.pause().await;
                return Ok(0);
            }
        };

        let ListingPage {
            pagination,
            mut product_urls,
        } = match self.parse_page(&body, &subcategory.url, |document, context| {
            self.catalog_parser.parse_listing(document, context)
        }) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("({}) Sub-subcategory skipped: {}", city, e);
                return Ok(0);
            }
        };

        if let Some(labels) = pagination {
            for (index, label) in labels.iter().enumerate() {
                let page_url = paged_url(&subcategory.url, label);
                debug!("({}) Page {}/{}: {}", city, index + 1, labels.len(), page_url);

                let body = match self.fetcher.fetch(&page_url).await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("({}) Listing page skipped: {}", city, e);
                        report.pages_failed += 1;
                        self.pause().await;
                        continue;
                    }
                };
                match self.parse_page(&body, &page_url, |document, context| {
                    self.catalog_parser.parse_product_urls(document, context)
                }) {
                    Ok(urls) => product_urls.extend(urls),
                    Err(e) => {
                        warn!("({}) Listing page skipped: {}", city, e);
                        report.pages_failed += 1;
                    }
                }
            }
        }

        info!(
            "({}) Extract {} products ({})",
            city,
            product_urls.len(),
            subcategory.url
        );
        let records = self.extract_all(product_urls).await;
        let fresh = seen.retain_unseen(records);

        info!("({}) Save products to sqlite: {} ({})", city, fresh.len(), subcategory.url);
        let saved = self
            .repository
            .append_batch(city, &fresh)
            .await
            .with_context(|| format!("Failed to store products for {city}"))?;
        Ok(saved)
    }

    /// Extract every product URL on a semaphore-bounded pool of spawned tasks
    async fn extract_all(&self, urls: Vec<String>) -> Vec<ProductRecord> {
        let semaphore = Arc::new(Semaphore::new(self.settings.product_concurrency));
        let mut tasks = Vec::with_capacity(urls.len());

        for url in urls {
            let semaphore = Arc::clone(&semaphore);
            let extractor = Arc::clone(&self.extractor);
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Extraction pool closed, {} skipped", url);
                        return Vec::new();
                    }
                };
                extractor.extract_product(&url).await
            }));
        }

        let mut records = Vec::new();
        for result in join_all(tasks).await {
            match result {
                Ok(mut extracted) => records.append(&mut extracted),
                Err(e) => warn!("❌ Extraction task join failed: {}", e),
            }
        }
        records
    }

    /// Parse a fetched body; the document never outlives this call
    fn parse_page<T>(
        &self,
        body: &str,
        url: &str,
        parse: impl FnOnce(&PageDocument, &ParseContext) -> ParsingResult<T>,
    ) -> Result<T, CrawlError> {
        let document = PageDocument::parse(body);
        let context = ParseContext::new(url, &self.settings.domain);
        parse(&document, &context).map_err(|source| CrawlError::Parse {
            url: url.to_string(),
            source,
        })
    }

    async fn pause(&self) {
        tokio::time::sleep(self.settings.failure_pause).await;
    }
}

/// Listing page `label` of the sub-subcategory at `url`
pub fn paged_url(url: &str, label: &str) -> String {
    format!("{}?{}={}", url, site::PAGE_QUERY_PARAM, label)
}
