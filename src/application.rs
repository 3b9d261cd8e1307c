//! Application layer
//!
//! Orchestrates fetching, parsing and storage into per-city crawls and the
//! multi-city run.

pub mod crawl_orchestrator;
pub mod multi_city_driver;
pub mod product_extractor;

pub use crawl_orchestrator::{CityCrawlReport, CityCrawler, CrawlError, CrawlSettings};
pub use multi_city_driver::{MultiCityDriver, RunSummary};
pub use product_extractor::ProductExtractor;
