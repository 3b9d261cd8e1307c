//! Product detail page parser
//!
//! A product page comes in one of two layouts:
//! - a single product with its own price and characteristics block, or
//! - a base product with a "ВАРИАНТЫ ТОВАРА" table, where every variant
//!   occupies three table rows and becomes its own record.
//!
//! Parsing is all-or-nothing per page: any missing element fails the whole page.

use scraper::{ElementRef, Selector};
use tracing::debug;

use super::characteristics::{clean_text, CharacteristicsExtractor};
use super::config::ProductPageSelectors;
use super::{compile_selector, resolve_url, ContextualParser, DetailParseContext, ParsingError, ParsingResult};
use crate::domain::constants::{fields, site};
use crate::domain::product_record::ProductRecord;
use crate::infrastructure::html_node::{text_excluding, PageDocument, PageNode};

/// Layout of a product page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    Single,
    VariantTable,
}

/// Facts shared by every record of one page
#[derive(Debug, Clone)]
struct PageHeader {
    category: String,
    section: String,
    city: String,
    city_phone: String,
}

impl PageHeader {
    fn base_record(&self, context: &DetailParseContext) -> ProductRecord {
        let mut record = ProductRecord::new();
        record.insert(fields::CATEGORY, self.category.as_str());
        record.insert(fields::SECTION, self.section.as_str());
        record.insert(fields::CRAWLED_AT, context.crawled_at.as_str());
        record.insert(fields::CITY, self.city.as_str());
        record.insert(fields::CITY_PHONE, self.city_phone.as_str());
        record
    }
}

/// Parser for product detail pages
pub struct ProductPageParser {
    tooltip: Selector,
    breadcrumb_nav: Selector,
    breadcrumb_list: Selector,
    breadcrumb_items: Selector,
    region_selected: Selector,
    contacts_phone: Selector,

    variants_block: Selector,
    variants_heading: Selector,
    variants_table: Selector,
    table_body: Selector,
    table_row: Selector,
    table_cell: Selector,
    link: Selector,
    variant_price_block: Selector,
    price_paragraph_tag: String,
    variant_characteristics: Selector,
    variant_characteristic_items: Selector,

    title: Selector,
    characteristics_root: Selector,
    primary_price: Selector,
    fallback_price: Selector,

    characteristics: CharacteristicsExtractor,
}

impl ProductPageParser {
    /// Create a new product page parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ProductPageSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &ProductPageSelectors) -> ParsingResult<Self> {
        Ok(Self {
            tooltip: compile_selector(&selectors.tooltip)?,
            breadcrumb_nav: compile_selector(&selectors.breadcrumb_nav)?,
            breadcrumb_list: compile_selector(&selectors.breadcrumb_list)?,
            breadcrumb_items: compile_selector(&selectors.breadcrumb_items)?,
            region_selected: compile_selector(&selectors.region_selected)?,
            contacts_phone: compile_selector(&selectors.contacts_phone)?,
            variants_block: compile_selector(&selectors.variants_block)?,
            variants_heading: compile_selector(&selectors.variants_heading)?,
            variants_table: compile_selector(&selectors.variants_table)?,
            table_body: compile_selector(&selectors.table_body)?,
            table_row: compile_selector(&selectors.table_row)?,
            table_cell: compile_selector(&selectors.table_cell)?,
            link: compile_selector(&selectors.link)?,
            variant_price_block: compile_selector(&selectors.variant_price_block)?,
            price_paragraph_tag: selectors.price_paragraph_tag.to_ascii_lowercase(),
            variant_characteristics: compile_selector(&selectors.variant_characteristics)?,
            variant_characteristic_items: compile_selector(&selectors.variant_characteristic_items)?,
            title: compile_selector(&selectors.title)?,
            characteristics_root: compile_selector(&selectors.characteristics_root)?,
            primary_price: compile_selector(&selectors.primary_price)?,
            fallback_price: compile_selector(&selectors.fallback_price)?,
            characteristics: CharacteristicsExtractor::new()?,
        })
    }

    /// Parse a raw page body
    pub fn parse(&self, body: &str, context: &DetailParseContext) -> ParsingResult<Vec<ProductRecord>> {
        let mut document = PageDocument::parse(body);
        self.parse_with_context(&mut document, context)
    }

    pub fn detect_layout(&self, document: &PageDocument) -> PageLayout {
        if self.variants_table(document).is_some() {
            PageLayout::VariantTable
        } else {
            PageLayout::Single
        }
    }

    /// The variants table, present only under a block headed "ВАРИАНТЫ ТОВАРА"
    fn variants_table<'a>(&self, document: &'a PageDocument) -> Option<ElementRef<'a>> {
        let block = document.find_first(&self.variants_block)?;
        let heading = block.find_first(&self.variants_heading)?;
        if PageNode::text(&heading) != site::VARIANTS_HEADING {
            return None;
        }
        block.find_first(&self.variants_table)
    }

    fn parse_header(&self, document: &PageDocument) -> ParsingResult<PageHeader> {
        let breadcrumbs = document
            .find_first(&self.breadcrumb_nav)
            .and_then(|nav| nav.find_first(&self.breadcrumb_list))
            .map(|list| list.find_all(&self.breadcrumb_items))
            .unwrap_or_default();
        let crumb = |index: usize| {
            breadcrumbs
                .get(index)
                .map(PageNode::text)
                .ok_or(ParsingError::BreadcrumbTooShort {
                    index,
                    found: breadcrumbs.len(),
                })
        };

        Ok(PageHeader {
            category: crumb(site::BREADCRUMB_CATEGORY_INDEX)?,
            section: crumb(site::BREADCRUMB_SECTION_INDEX)?,
            city: required_text(document.find_first(&self.region_selected), "region_selected")?,
            city_phone: required_text(document.find_first(&self.contacts_phone), "contacts_phone")?,
        })
    }

    fn parse_variants(
        &self,
        table: ElementRef<'_>,
        header: &PageHeader,
        context: &DetailParseContext,
    ) -> ParsingResult<Vec<ProductRecord>> {
        let body = table
            .find_first(&self.table_body)
            .ok_or_else(|| ParsingError::required_field_missing("variants_table_body", Some(context.url.as_str())))?;
        let rows = body.find_all(&self.table_row);

        let mut records = Vec::with_capacity(rows.len() / 3);
        for i in (2..rows.len()).step_by(3) {
            let name_cell = rows[i - 2]
                .find_first(&self.table_cell)
                .ok_or_else(|| ParsingError::required_field_missing("variant_name_cell", Some(context.url.as_str())))?;
            let detail_row = rows[i];

            let variant_link = name_cell.find_first(&self.link);
            let url = match variant_link.as_ref().and_then(|link| PageNode::attr(link, "href")) {
                Some(href) => resolve_url(&href, &context.base_url)?,
                None => context.url.clone(),
            };
            let name_text = match variant_link.as_ref() {
                Some(link) => text_excluding(&name_cell, link),
                None => PageNode::text(&name_cell),
            };

            let characteristic_nodes = detail_row
                .find_first(&self.table_cell)
                .and_then(|cell| cell.find_first(&self.variant_characteristics))
                .ok_or_else(|| ParsingError::required_field_missing("variant_characteristics", Some(context.url.as_str())))?
                .find_all(&self.variant_characteristic_items);

            let price_block = detail_row
                .find_first(&self.variant_price_block)
                .ok_or_else(|| ParsingError::required_field_missing("variant_price_block", Some(context.url.as_str())))?;

            let mut record = header.base_record(context);
            for paragraph in price_block.children().iter().filter(|child| child.tag() == self.price_paragraph_tag) {
                let (label, value) = split_price(&PageNode::text(paragraph))?;
                record.insert(label, value);
            }
            record.insert(fields::NAME, variant_name(&name_text));
            record.insert(fields::PRODUCT_URL, url);
            record.merge(self.characteristics.extract(&characteristic_nodes));

            records.push(record);
        }

        Ok(records)
    }

    fn parse_single(
        &self,
        document: &PageDocument,
        header: &PageHeader,
        context: &DetailParseContext,
    ) -> ParsingResult<ProductRecord> {
        let name = required_text(document.find_first(&self.title), "title")?;

        let price = document
            .find_first(&self.primary_price)
            .or_else(|| document.find_first(&self.fallback_price))
            .map(|element| PageNode::text(&element))
            .ok_or_else(|| ParsingError::required_field_missing("price", Some(context.url.as_str())))?;

        let root = document
            .find_first(&self.characteristics_root)
            .ok_or_else(|| ParsingError::required_field_missing("characteristics_root", Some(context.url.as_str())))?;
        let characteristic_nodes: Vec<_> = root
            .children()
            .into_iter()
            .filter(|child| child.tag() == "div" && PageNode::attr(child, "class").is_none())
            .collect();

        let mut record = header.base_record(context);
        record.insert(fields::NAME, clean_text(&name));
        record.insert(fields::PRODUCT_URL, context.url.as_str());
        record.insert(fields::PRICE, price);
        record.merge(self.characteristics.extract(&characteristic_nodes));

        Ok(record)
    }
}

impl ContextualParser for ProductPageParser {
    type Output = Vec<ProductRecord>;
    type Context = DetailParseContext;

    fn parse_with_context(&self, document: &mut PageDocument, context: &Self::Context) -> ParsingResult<Self::Output> {
        let removed = document.remove_all(&self.tooltip);
        let document: &PageDocument = document;

        let header = self.parse_header(document)?;

        let records = match self.variants_table(document) {
            Some(table) => self.parse_variants(table, &header, context)?,
            None => vec![self.parse_single(document, &header, context)?],
        };

        debug!(
            "Parsed {} record(s) from {} ({} tooltip(s) removed)",
            records.len(),
            context.url,
            removed
        );
        Ok(records)
    }
}

fn required_text(element: Option<ElementRef<'_>>, field: &str) -> ParsingResult<String> {
    element
        .map(|element| PageNode::text(&element))
        .ok_or_else(|| ParsingError::required_field_missing(field, None))
}

/// Split a price line "label — value" into its label and value.
/// Anything after a second separator is dropped.
pub fn split_price(text: &str) -> ParsingResult<(String, String)> {
    let mut parts = text.split(site::PRICE_SEPARATOR);
    let label = parts.next().unwrap_or_default();
    let value = parts
        .next()
        .ok_or_else(|| ParsingError::MalformedPrice { text: text.to_string() })?;
    Ok((label.trim().to_string(), value.trim().to_string()))
}

/// Variant row text without its leading icon characters
pub fn variant_name(row_text: &str) -> String {
    let name: String = row_text.chars().skip(site::VARIANT_NAME_PREFIX_CHARS).collect();
    name.replace('"', "'")
}
