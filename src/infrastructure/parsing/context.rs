//! Parsing contexts for catalog and product pages
//!
//! Provides the per-page facts a parser cannot read from the markup itself.

use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::constants::site;

/// Context for one catalog-level page (category list, subcategory, listing)
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// URL of the page being parsed
    pub page_url: String,

    /// Base URL for resolving relative links
    pub base_url: String,
}

impl ParseContext {
    pub fn new(page_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            base_url: base_url.into(),
        }
    }
}

/// Context for one product detail page
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    /// Product URL being parsed; becomes the record URL unless a variant links elsewhere
    pub url: String,

    /// Base URL for resolving variant links
    pub base_url: String,

    /// Crawl timestamp written into every record of this page
    pub crawled_at: String,
}

impl DetailParseContext {
    /// Create a context stamped with the current Moscow time
    pub fn new(url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_url: base_url.into(),
            crawled_at: moscow_timestamp(Utc::now()),
        }
    }

    /// Override the crawl timestamp
    pub fn with_crawled_at(mut self, crawled_at: impl Into<String>) -> Self {
        self.crawled_at = crawled_at.into();
        self
    }
}

/// Format an instant as Moscow local time
pub fn moscow_timestamp(instant: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(site::MSK_OFFSET_SECONDS) {
        Some(msk) => instant.with_timezone(&msk).format(site::TIMESTAMP_FORMAT).to_string(),
        None => instant.format(site::TIMESTAMP_FORMAT).to_string(),
    }
}
