//! Repository interfaces for crawled product data
//!
//! The orchestrator only knows this trait; the SQLite-backed store lives in
//! the infrastructure layer.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::catalog::City;
use crate::domain::product_record::ProductRecord;

#[async_trait]
pub trait ProductBatchRepository: Send + Sync {
    /// Append one crawl batch to the city's durable store, creating it if absent.
    /// Returns how many records were actually written.
    async fn append_batch(&self, city: &City, records: &[ProductRecord]) -> Result<usize>;
}
