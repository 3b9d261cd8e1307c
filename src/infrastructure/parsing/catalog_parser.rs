//! Catalog navigation parser
//!
//! Reads the three catalog levels: the category list on `/catalog/`, the
//! "show all" subcategory block of a category page, and the product listing
//! (with its pagination) of a sub-subcategory page.

use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use super::config::CatalogSelectors;
use super::{compile_selector, resolve_url, ParseContext, ParsingError, ParsingResult};
use crate::domain::catalog::CatalogLink;
use crate::infrastructure::html_node::{PageDocument, PageNode};

/// What one listing page yields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Page-index labels of the pagination control, `None` when the page has no pagination
    pub pagination: Option<Vec<String>>,

    /// Absolute product URLs in listing order
    pub product_urls: Vec<String>,
}

pub struct CatalogParser {
    category_container: Selector,
    subcategory_container: Selector,
    link: Selector,
    pagination: Selector,
    pagination_page: Selector,
    catalog_block: Selector,
    product_title: Selector,
}

impl CatalogParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&CatalogSelectors::default())
    }

    pub fn with_config(selectors: &CatalogSelectors) -> ParsingResult<Self> {
        Ok(Self {
            category_container: compile_selector(&selectors.category_container)?,
            subcategory_container: compile_selector(&selectors.subcategory_container)?,
            link: compile_selector(&selectors.link)?,
            pagination: compile_selector(&selectors.pagination)?,
            pagination_page: compile_selector(&selectors.pagination_page)?,
            catalog_block: compile_selector(&selectors.catalog_block)?,
            product_title: compile_selector(&selectors.product_title)?,
        })
    }

    /// Every anchor of the top-level category container
    pub fn parse_category_links(&self, document: &PageDocument, context: &ParseContext) -> ParsingResult<Vec<CatalogLink>> {
        let container = document
            .find_first(&self.category_container)
            .ok_or_else(|| ParsingError::required_field_missing("category_container", Some(context.page_url.as_str())))?;

        self.collect_links(&container, context)
    }

    /// Every anchor of the "show all subcategories" container
    pub fn parse_subcategory_links(&self, document: &PageDocument, context: &ParseContext) -> ParsingResult<Vec<CatalogLink>> {
        let container = document
            .find_first(&self.subcategory_container)
            .ok_or_else(|| ParsingError::required_field_missing("subcategory_container", Some(context.page_url.as_str())))?;

        self.collect_links(&container, context)
    }

    /// Pagination labels and product URLs of a listing page
    pub fn parse_listing(&self, document: &PageDocument, context: &ParseContext) -> ParsingResult<ListingPage> {
        let pagination = document.find_first(&self.pagination).map(|control| {
            control
                .find_all(&self.pagination_page)
                .iter()
                .map(PageNode::text)
                .collect::<Vec<_>>()
        });

        let product_urls = self.parse_product_urls(document, context)?;

        Ok(ListingPage {
            pagination,
            product_urls,
        })
    }

    /// Product URLs of a listing page, one per product title
    pub fn parse_product_urls(&self, document: &PageDocument, context: &ParseContext) -> ParsingResult<Vec<String>> {
        let block = document
            .find_first(&self.catalog_block)
            .ok_or_else(|| ParsingError::required_field_missing("catalog_block", Some(context.page_url.as_str())))?;

        let titles = block.find_all(&self.product_title);
        let mut urls = Vec::with_capacity(titles.len());

        for title in titles {
            let href = self.following_link(title).and_then(|link| PageNode::attr(&link, "href"));
            match href {
                Some(href) => urls.push(resolve_url(&href, &context.base_url)?),
                None => warn!(
                    "Product title without link on {}: '{}'",
                    context.page_url,
                    PageNode::text(&title)
                ),
            }
        }

        debug!("Found {} product URLs on {}", urls.len(), context.page_url);
        Ok(urls)
    }

    fn collect_links(&self, container: &ElementRef<'_>, context: &ParseContext) -> ParsingResult<Vec<CatalogLink>> {
        let mut links = Vec::new();
        for anchor in container.find_all(&self.link) {
            let Some(href) = PageNode::attr(&anchor, "href") else {
                debug!("Skipping anchor without href on {}", context.page_url);
                continue;
            };
            links.push(CatalogLink::new(
                PageNode::text(&anchor),
                resolve_url(&href, &context.base_url)?,
            ));
        }
        Ok(links)
    }

    /// Nearest link at or after `title` in document order: its own descendants
    /// first, then the following siblings of it and of its ancestors.
    fn following_link<'a>(&self, title: ElementRef<'a>) -> Option<ElementRef<'a>> {
        if let Some(link) = title.find_first(&self.link) {
            return Some(link);
        }

        let mut cursor = Some(*title);
        while let Some(node) = cursor {
            let mut sibling = node.next_sibling();
            while let Some(current) = sibling {
                if let Some(element) = ElementRef::wrap(current) {
                    if self.link.matches(&element) {
                        return Some(element);
                    }
                    if let Some(link) = element.find_first(&self.link) {
                        return Some(link);
                    }
                }
                sibling = current.next_sibling();
            }
            cursor = node.parent();
        }

        None
    }
}
