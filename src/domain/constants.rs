//! 사이트 특성 및 도메인 상수들
//!
//! santech.ru 카탈로그의 고유한 특성들과 제품 레코드 필드 이름을 정의합니다.

/// santech.ru site characteristics
pub mod site {
    /// Root domain; every relative href on the site resolves against it
    pub const DOMAIN: &str = "https://www.santech.ru";

    /// Path of the top-level catalog page, appended to a city base URL
    pub const CATALOG_PATH: &str = "/catalog/";

    /// City served from the root domain instead of `{domain}/{city}`
    pub const ROOT_CITY: &str = "moscow";

    /// Promotional category that never leads to regular listings
    pub const PROMO_CATEGORY: &str = "Распродажа";

    /// Heading text that marks a real variants block on a product page
    pub const VARIANTS_HEADING: &str = "ВАРИАНТЫ ТОВАРА";

    /// Query parameter used by listing pagination
    pub const PAGE_QUERY_PARAM: &str = "page";

    /// Breadcrumb positions of category and section (0-based)
    pub const BREADCRUMB_CATEGORY_INDEX: usize = 2;
    pub const BREADCRUMB_SECTION_INDEX: usize = 3;

    /// Leading characters of a variant row that belong to an icon/label, not the name
    pub const VARIANT_NAME_PREFIX_CHARS: usize = 2;

    /// Separator between label and value in a variant price line
    pub const PRICE_SEPARATOR: &str = " —";

    /// Moscow time offset used for the crawl timestamp
    pub const MSK_OFFSET_SECONDS: i32 = 3 * 3600;

    /// Crawl timestamp format
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Cities crawled by a default run
    pub const CITIES: [&str; 14] = [
        "ulyanovsk",
        "novorossiysk",
        "tumen",
        "belgorod",
        "spb",
        "krasnodar",
        "ekb",
        "nn",
        "magnitogorsk",
        "nizhniytagil",
        "novosibirsk",
        "surgut",
        "chelyabinsk",
        "moscow",
    ];
}

/// Core field names of a product record, as they appear in exported reports
pub mod fields {
    pub const CATEGORY: &str = "Категория";
    pub const SECTION: &str = "Раздел";
    pub const CRAWLED_AT: &str = "Время парсинга (мск)";
    pub const CITY: &str = "Город";
    pub const CITY_PHONE: &str = "Телефон города";
    pub const NAME: &str = "Наименование";
    pub const PRODUCT_URL: &str = "URL товара";
    pub const PRICE: &str = "Цена";
}
