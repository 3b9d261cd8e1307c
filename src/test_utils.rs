//! Test utilities
//!
//! HTML builders shaped like the santech.ru markup, an in-memory
//! [`PageFetcher`] and a repository that records every appended batch.
//! Shared by unit tests, the integration tests and the benchmark.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::domain::catalog::City;
use crate::domain::product_record::ProductRecord;
use crate::domain::repositories::ProductBatchRepository;
use crate::infrastructure::simple_http_client::{FetchError, PageFetcher};

fn document(body: &str) -> String {
    format!("<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>{body}</body></html>")
}

fn anchors<'a>(links: impl IntoIterator<Item = (&'a str, &'a str)>, class: &str) -> String {
    links
        .into_iter()
        .map(|(text, href)| format!("<a class=\"{class}\" href=\"{href}\">{text}</a>"))
        .collect()
}

/// `/catalog/` page with the given (text, href) category anchors
pub fn catalog_page(categories: &[(&str, &str)]) -> String {
    document(&format!(
        "<main><div class=\"ss-catalog-categories\">{}</div></main>",
        anchors(categories.iter().copied(), "ss-catalog-categories__link")
    ))
}

/// Category page whose "show all" block links to the given sub-subcategories
pub fn subcategory_page(hrefs: &[&str]) -> String {
    let links = hrefs.iter().enumerate().map(|(i, href)| {
        format!("<div class=\"ss-catalog-categories__item\"><a href=\"{href}\">Раздел {i}</a></div>")
    });
    document(&format!(
        "<div class=\"ss-catalog-categories ss-catalog-categories--show-all\">{}</div>",
        links.collect::<String>()
    ))
}

/// Listing page with one product card per href and, when `page_labels` is
/// not empty, a pagination control
pub fn listing_page(product_hrefs: &[&str], page_labels: &[&str]) -> String {
    let cards: String = product_hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| {
            format!(
                "<div class=\"ss-catalog-product\"><div class=\"ss-catalog-product__title\"><a href=\"{href}\">Товар {i}</a></div></div>"
            )
        })
        .collect();

    let pagination = if page_labels.is_empty() {
        String::new()
    } else {
        let pages: String = page_labels
            .iter()
            .map(|label| format!("<a class=\"ss-pagination__page\" href=\"?page={label}\"> {label} </a>"))
            .collect();
        format!(
            "<div class=\"ss-pagination__nav ss-w-100p ss-w-md-auto ss-justify-content-center ss-justify-content-md-start\">{pages}</div>"
        )
    };

    document(&format!("<div class=\"catalog-block\">{cards}</div>{pagination}"))
}

/// Region, phone and breadcrumb (Главная / Каталог / Трубы / Полипропилен)
fn product_page_header() -> String {
    concat!(
        "<header>",
        "<div class=\"ss-header-desktop__regions\"><a class=\"ss-regions__selected\" href=\"#\"> Москва </a></div>",
        "<div class=\"ss-header-desktop__contacts-phone\"><a href=\"tel:+74950000000\">+7 (495) 000-00-00</a></div>",
        "</header>",
        "<nav class=\"ss-breadcrumbs\"><ul>",
        "<li><span itemprop=\"title\">Главная</span></li>",
        "<li><span itemprop=\"title\">Каталог</span></li>",
        "<li><span itemprop=\"title\">Трубы</span></li>",
        "<li><span itemprop=\"title\">Полипропилен</span></li>",
        "</ul></nav>"
    )
    .to_string()
}

/// Label/value `div` pairs; the first label carries a tooltip
fn characteristic_pairs(characteristics: &[(&str, &str)]) -> String {
    characteristics
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let tooltip = if i == 0 {
                "<div class=\"tip a-inline-block\">?</div>"
            } else {
                ""
            };
            format!("<div>{label}{tooltip}</div><div><div>{value}</div></div>")
        })
        .collect()
}

/// Single-product page
pub fn single_product_page(
    name: &str,
    price: Option<&str>,
    fallback_price: Option<&str>,
    characteristics: &[(&str, &str)],
) -> String {
    let price = price
        .map(|p| format!("<div class=\"ss-product-info__price\"><b>{p}</b></div>"))
        .unwrap_or_default();
    let fallback_price = fallback_price
        .map(|p| format!("<div class=\"ss-mt-10\"><b>{p}</b></div>"))
        .unwrap_or_default();

    document(&format!(
        "{header}<h1 class=\"ss-category-title\">{name}</h1>\
         <div class=\"ss-product-info__box\">{price}{fallback_price}</div>\
         <div class=\"ss-col ss-mb-20\"><div class=\"ss-product-property\">{pairs}</div></div>",
        header = product_page_header(),
        pairs = characteristic_pairs(characteristics),
    ))
}

/// One variant of a variant-table page
#[derive(Debug, Clone, Copy)]
pub struct VariantRow<'a> {
    /// Row text including its 2-character prefix, e.g. "• Кран 1/2"
    pub name: &'a str,
    pub href: Option<&'a str>,
    pub prices: &'a [(&'a str, &'a str)],
    pub characteristics: &'a [(&'a str, &'a str)],
}

/// Variant-table page, three table rows per variant
pub fn variant_product_page(variants: &[VariantRow<'_>]) -> String {
    let rows: String = variants
        .iter()
        .map(|variant| {
            let link = variant
                .href
                .map(|href| format!(" <a href=\"{href}\">Подробнее</a>"))
                .unwrap_or_default();
            let prices: String = variant
                .prices
                .iter()
                .map(|(label, value)| format!("<p>{label} — <b>{value}</b></p>"))
                .collect();
            let pairs: String = variant
                .characteristics
                .iter()
                .map(|(label, value)| format!("<div>{label}</div><div><div>{value}</div></div>"))
                .collect();

            format!(
                "<tr><td>{name}{link}</td></tr>\
                 <tr><td class=\"ss-muted\">Артикул</td></tr>\
                 <tr><td><div class=\"ss-product-property ss-product-property--extralight-grey\">{pairs}</div></td>\
                 <td><div class=\"ss-col-12 ss-col-xl-4 ss-col-md-5 ss-js-price\">{prices}<span>за шт.</span></div></td></tr>",
                name = variant.name,
            )
        })
        .collect();

    document(&format!(
        "{header}<h1 class=\"ss-category-title\">Кран шаровой</h1>\
         <div class=\"ss-product-other-variants\"><h2 class=\"ss-category-title\">ВАРИАНТЫ ТОВАРА</h2>\
         <table class=\"ss-product-other-variants__table\"><tbody>{rows}</tbody></table></div>",
        header = product_page_header(),
    ))
}

/// In-memory [`PageFetcher`]: known URLs return their body, anything else is a 404
#[derive(Debug, Default)]
pub struct StaticPageFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// Every requested URL, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// [`ProductBatchRepository`] that keeps every batch in memory
#[derive(Debug, Default)]
pub struct RecordingBatchRepository {
    batches: Mutex<Vec<(City, Vec<ProductRecord>)>>,
}

impl RecordingBatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(City, Vec<ProductRecord>)> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every stored record, in append order
    pub fn records(&self) -> Vec<ProductRecord> {
        self.batches()
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect()
    }
}

#[async_trait]
impl ProductBatchRepository for RecordingBatchRepository {
    async fn append_batch(&self, city: &City, records: &[ProductRecord]) -> anyhow::Result<usize> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((city.clone(), records.to_vec()));
        Ok(records.len())
    }
}
