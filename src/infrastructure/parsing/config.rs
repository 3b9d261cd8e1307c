//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors for the catalog and product pages. Selectors are
//! plain strings here and get compiled once when a parser is built.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingConfig {
    pub catalog_selectors: CatalogSelectors,

    pub product_page_selectors: ProductPageSelectors,
}

/// CSS selectors for catalog, subcategory and listing pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSelectors {
    /// Container of the top-level category anchors on `/catalog/`
    pub category_container: String,

    /// "Show all subcategories" container on a subcategory page
    pub subcategory_container: String,

    pub link: String,

    /// Pagination control on a listing page
    pub pagination: String,

    /// Page-index anchors inside the pagination control
    pub pagination_page: String,

    /// Listing container
    pub catalog_block: String,

    /// Product titles inside the listing container
    pub product_title: String,
}

impl Default for CatalogSelectors {
    fn default() -> Self {
        Self {
            category_container: "div.ss-catalog-categories".to_string(),
            subcategory_container: "div.ss-catalog-categories--show-all".to_string(),
            link: "a".to_string(),
            pagination: "div.ss-pagination__nav.ss-w-100p.ss-w-md-auto.ss-justify-content-center.ss-justify-content-md-start".to_string(),
            pagination_page: "a.ss-pagination__page".to_string(),
            catalog_block: "div.catalog-block".to_string(),
            product_title: "div.ss-catalog-product__title".to_string(),
        }
    }
}

/// CSS selectors for product detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPageSelectors {
    /// Decorative tooltips removed before any text is read
    pub tooltip: String,

    /// Breadcrumb trail: the first list of the first breadcrumb nav, then its titles
    pub breadcrumb_nav: String,
    pub breadcrumb_list: String,
    pub breadcrumb_items: String,

    pub region_selected: String,
    pub contacts_phone: String,

    /// Variants block, its heading and table
    pub variants_block: String,
    pub variants_heading: String,
    pub variants_table: String,
    pub table_body: String,
    pub table_row: String,
    pub table_cell: String,
    pub link: String,

    /// Price column of a variant row; its direct `<p>` children are price lines
    pub variant_price_block: String,
    pub price_paragraph_tag: String,

    /// Characteristics container of a variant row and its label/value nodes
    pub variant_characteristics: String,
    pub variant_characteristic_items: String,

    /// Single-product layout
    pub title: String,
    pub characteristics_root: String,
    pub primary_price: String,
    pub fallback_price: String,
}

impl Default for ProductPageSelectors {
    fn default() -> Self {
        Self {
            tooltip: "div.tip.a-inline-block".to_string(),
            breadcrumb_nav: "nav.ss-breadcrumbs".to_string(),
            breadcrumb_list: "ul".to_string(),
            breadcrumb_items: "[itemprop=\"title\"]".to_string(),
            region_selected: "div.ss-header-desktop__regions a.ss-regions__selected".to_string(),
            contacts_phone: "div.ss-header-desktop__contacts-phone a".to_string(),
            variants_block: "div.ss-product-other-variants".to_string(),
            variants_heading: "h2.ss-category-title".to_string(),
            variants_table: "table.ss-product-other-variants__table".to_string(),
            table_body: "tbody".to_string(),
            table_row: "tr".to_string(),
            table_cell: "td".to_string(),
            link: "a".to_string(),
            variant_price_block: "div.ss-col-12.ss-col-xl-4.ss-col-md-5.ss-js-price".to_string(),
            price_paragraph_tag: "p".to_string(),
            variant_characteristics: "div.ss-product-property--extralight-grey".to_string(),
            variant_characteristic_items: "div:not([class])".to_string(),
            title: "h1.ss-category-title".to_string(),
            characteristics_root: "div.ss-col.ss-mb-20 div.ss-product-property".to_string(),
            primary_price: "div.ss-product-info__price b".to_string(),
            fallback_price: "div.ss-product-info__box div.ss-mt-10 b".to_string(),
        }
    }
}
