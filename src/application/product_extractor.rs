//! Product page extraction: fetch one product URL and turn it into records
//!
//! Never fails outward. A fetch or parse failure is logged and yields no records.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::product_record::ProductRecord;
use crate::infrastructure::parsing::{DetailParseContext, ProductPageParser};
use crate::infrastructure::simple_http_client::PageFetcher;

pub struct ProductExtractor {
    fetcher: Arc<dyn PageFetcher>,
    parser: ProductPageParser,
    base_url: String,
}

impl ProductExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: ProductPageParser, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            parser,
            base_url: base_url.into(),
        }
    }

    pub async fn extract_product(&self, url: &str) -> Vec<ProductRecord> {
        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Product page skipped: {}", e);
                return Vec::new();
            }
        };

        // The parsed document stays inside this synchronous call
        let context = DetailParseContext::new(url, &self.base_url);
        match self.parser.parse(&body, &context) {
            Ok(records) => {
                debug!("Extracted {} record(s) from {}", records.len(), url);
                records
            }
            Err(e) => {
                warn!("Product page {} skipped: {}", url, e);
                Vec::new()
            }
        }
    }
}
