//! HTML parsing for santech.ru catalog and product pages
//!
//! Parsers are built once from [`ParsingConfig`] (selectors compiled up front)
//! and then used read-only from any number of tasks.

pub mod catalog_parser;
pub mod characteristics;
pub mod config;
pub mod context;
pub mod error;
pub mod product_page_parser;

// Re-export public types
pub use catalog_parser::{CatalogParser, ListingPage};
pub use characteristics::CharacteristicsExtractor;
pub use config::ParsingConfig;
pub use context::{DetailParseContext, ParseContext};
pub use error::{ParsingError, ParsingResult};
pub use product_page_parser::{PageLayout, ProductPageParser};

use scraper::Selector;
use url::Url;

use crate::infrastructure::html_node::PageDocument;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse a document with contextual information
    fn parse_with_context(&self, document: &mut PageDocument, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile a selector string, mapping the error into [`ParsingError`]
pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, &e.to_string()))
}

/// Resolve `href` against `base_url` into an absolute URL
pub fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    let base = Url::parse(base_url)
        .map_err(|e| ParsingError::url_resolution_failed(href, &e.to_string(), Some(base_url)))?;
    base.join(href.trim())
        .map(String::from)
        .map_err(|e| ParsingError::url_resolution_failed(href, &e.to_string(), Some(base_url)))
}
