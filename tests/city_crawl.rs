//! City crawl and multi-city run against an in-memory site

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use santech_crawler::application::{CityCrawler, CrawlSettings};
use santech_crawler::domain::constants::fields;
use santech_crawler::domain::{City, ProductRecord};
use santech_crawler::infrastructure::config::AppConfig;
use santech_crawler::infrastructure::ParsingConfig;
use santech_crawler::test_utils::{
    catalog_page, listing_page, single_product_page, subcategory_page, variant_product_page, RecordingBatchRepository,
    StaticPageFetcher, VariantRow,
};

const DOMAIN: &str = "https://www.santech.ru";

fn url(path: &str) -> String {
    format!("{DOMAIN}{path}")
}

fn product(name: &str) -> String {
    single_product_page(name, Some("100 руб."), None, &[("Материал", "PP-R")])
}

fn crawler(fetcher: StaticPageFetcher, repository: Arc<RecordingBatchRepository>) -> (CityCrawler, Arc<StaticPageFetcher>) {
    let fetcher = Arc::new(fetcher);
    let settings = CrawlSettings {
        failure_pause: Duration::from_millis(1),
        product_concurrency: 4,
        ..Default::default()
    };
    let crawler = CityCrawler::new(fetcher.clone(), repository, &ParsingConfig::default(), settings).unwrap();
    (crawler, fetcher)
}

fn urls_of(records: &[ProductRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.product_url().unwrap().to_string())
        .collect()
}

/// spb storefront: one real category with a paginated listing, one broken
/// sub-subcategory and the promo category
fn spb_site() -> StaticPageFetcher {
    StaticPageFetcher::new()
        .with_page(
            url("/spb/catalog/"),
            catalog_page(&[("Трубы", "/catalog/truby/"), (" Распродажа ", "/catalog/sale/")]),
        )
        .with_page(
            url("/catalog/truby/"),
            subcategory_page(&["/catalog/truby/pp/", "/catalog/truby/broken/"]),
        )
        .with_page(url("/catalog/truby/pp/"), listing_page(&["/p/1/", "/p/2/"], &["2"]))
        .with_page(url("/catalog/truby/pp/?page=2"), listing_page(&["/p/2/", "/p/3/"], &[]))
        .with_page(url("/p/1/"), product("Труба 20"))
        .with_page(url("/p/2/"), product("Труба 25"))
        .with_page(
            url("/p/3/"),
            variant_product_page(&[
                VariantRow {
                    name: "• Труба 20 (вариант)",
                    href: Some("/p/1/"),
                    prices: &[("Цена", "90 руб.")],
                    characteristics: &[],
                },
                VariantRow {
                    name: "• Труба 32",
                    href: None,
                    prices: &[("Цена", "150 руб.")],
                    characteristics: &[("Диаметр", "32 мм")],
                },
            ]),
        )
}

#[tokio::test]
async fn test_city_crawl_saves_each_product_once() {
    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, fetcher) = crawler(spb_site(), repository.clone());

    let report = crawler.crawl_city(&City::new("spb")).await;

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(report.categories, 1);
    assert_eq!(report.subcategories_visited, 2);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.products_saved, 3);

    // one batch, for the sub-subcategory that loaded
    let batches = repository.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, City::new("spb"));

    let urls = urls_of(&batches[0].1);
    let unique: HashSet<_> = urls.iter().cloned().collect();
    assert_eq!(urls.len(), unique.len());
    assert_eq!(unique, HashSet::from([url("/p/1/"), url("/p/2/"), url("/p/3/")]));

    // promo category is never visited
    assert!(!fetcher.requests().contains(&url("/catalog/sale/")));
}

#[tokio::test]
async fn test_every_record_carries_city_and_absolute_url() {
    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, _) = crawler(spb_site(), repository.clone());
    crawler.crawl_city(&City::new("spb")).await;

    for record in repository.records() {
        assert!(record.product_url().unwrap().starts_with("https://"));
        assert_eq!(record.get(fields::CITY), Some("Москва"));
        assert_eq!(record.get(fields::CATEGORY), Some("Трубы"));
    }
}

#[tokio::test]
async fn test_failed_pagination_page_is_skipped() {
    let site = StaticPageFetcher::new()
        .with_page(url("/catalog/"), catalog_page(&[("Трубы", "/catalog/truby/")]))
        .with_page(url("/catalog/truby/"), subcategory_page(&["/catalog/truby/pp/"]))
        .with_page(url("/catalog/truby/pp/"), listing_page(&["/p/1/"], &["2", "3"]))
        .with_page(url("/catalog/truby/pp/?page=2"), listing_page(&["/p/2/"], &[]))
        .with_page(url("/p/1/"), product("Труба 20"))
        .with_page(url("/p/2/"), product("Труба 25"));

    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, _) = crawler(site, repository.clone());
    let report = crawler.crawl_city(&City::new("moscow")).await;

    assert!(report.succeeded());
    assert_eq!(report.pages_failed, 1);
    let mut urls = urls_of(&repository.records());
    urls.sort();
    assert_eq!(urls, vec![url("/p/1/"), url("/p/2/")]);
}

#[tokio::test]
async fn test_listing_without_catalog_block_skips_only_that_subcategory() {
    let site = StaticPageFetcher::new()
        .with_page(url("/catalog/"), catalog_page(&[("Трубы", "/catalog/truby/")]))
        .with_page(
            url("/catalog/truby/"),
            subcategory_page(&["/catalog/truby/empty/", "/catalog/truby/pp/"]),
        )
        .with_page(url("/catalog/truby/empty/"), "<html><body><p>Нет товаров</p></body></html>")
        .with_page(url("/catalog/truby/pp/"), listing_page(&["/p/1/"], &[]))
        .with_page(url("/p/1/"), product("Труба 20"));

    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, _) = crawler(site, repository.clone());
    let report = crawler.crawl_city(&City::new("moscow")).await;

    assert!(report.succeeded());
    assert_eq!(report.subcategories_visited, 2);
    assert_eq!(urls_of(&repository.records()), vec![url("/p/1/")]);
}

#[tokio::test]
async fn test_broken_categories_are_skipped() {
    let site = StaticPageFetcher::new()
        .with_page(
            url("/catalog/"),
            catalog_page(&[
                ("Отопление", "/catalog/otoplenie/"),
                ("Насосы", "/catalog/nasosy/"),
                ("Трубы", "/catalog/truby/"),
            ]),
        )
        // /catalog/otoplenie/ is missing and 404s
        .with_page(url("/catalog/nasosy/"), "<html><body><h1>Насосы</h1></body></html>")
        .with_page(url("/catalog/truby/"), subcategory_page(&["/catalog/truby/pp/"]))
        .with_page(url("/catalog/truby/pp/"), listing_page(&["/p/1/", "/p/2/"], &[]))
        .with_page(url("/p/1/"), product("Труба 20"))
        .with_page(url("/p/2/"), product("Труба 25"));

    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, fetcher) = crawler(site, repository.clone());
    let report = crawler.crawl_city(&City::new("moscow")).await;

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(report.categories, 3);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.subcategories_visited, 1);
    assert_eq!(report.products_saved, 2);

    let mut urls = urls_of(&repository.records());
    urls.sort();
    assert_eq!(urls, vec![url("/p/1/"), url("/p/2/")]);

    let requests = fetcher.requests();
    assert!(requests.contains(&url("/catalog/otoplenie/")));
    assert!(requests.contains(&url("/catalog/nasosy/")));
}

#[tokio::test]
async fn test_product_seen_in_earlier_subcategory_is_not_saved_again() {
    let site = StaticPageFetcher::new()
        .with_page(url("/catalog/"), catalog_page(&[("Трубы", "/catalog/truby/")]))
        .with_page(url("/catalog/truby/"), subcategory_page(&["/catalog/truby/a/", "/catalog/truby/b/"]))
        .with_page(url("/catalog/truby/a/"), listing_page(&["/p/1/"], &[]))
        .with_page(url("/catalog/truby/b/"), listing_page(&["/p/1/", "/p/2/"], &[]))
        .with_page(url("/p/1/"), product("Труба 20"))
        .with_page(url("/p/2/"), product("Труба 25"));

    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, _) = crawler(site, repository.clone());
    crawler.crawl_city(&City::new("moscow")).await;

    let batches = repository.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(urls_of(&batches[0].1), vec![url("/p/1/")]);
    assert_eq!(urls_of(&batches[1].1), vec![url("/p/2/")]);
}

#[tokio::test]
async fn test_failed_product_pages_leave_an_empty_batch() {
    let site = StaticPageFetcher::new()
        .with_page(url("/catalog/"), catalog_page(&[("Трубы", "/catalog/truby/")]))
        .with_page(url("/catalog/truby/"), subcategory_page(&["/catalog/truby/pp/"]))
        .with_page(url("/catalog/truby/pp/"), listing_page(&["/p/404/"], &[]));

    let repository = Arc::new(RecordingBatchRepository::new());
    let (crawler, _) = crawler(site, repository.clone());
    let report = crawler.crawl_city(&City::new("moscow")).await;

    assert!(report.succeeded());
    assert_eq!(report.products_saved, 0);
    assert_eq!(repository.batches().len(), 1);
    assert!(repository.batches()[0].1.is_empty());
}

#[tokio::test]
async fn test_full_run_isolates_failing_city_and_exports() {
    let reports = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    config.crawler.cities = vec!["spb".to_string(), "ekb".to_string()];
    config.crawler.failure_pause_ms = 1;
    config.storage.reports_dir = reports.path().to_path_buf();

    // ekb has no catalog page at all
    let summary = santech_crawler::run_crawl(&config, Arc::new(spb_site())).await.unwrap();

    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.reports.len(), 2);
    let failed: Vec<_> = summary.failed_cities().map(|report| report.city.as_str()).collect();
    assert_eq!(failed, vec!["ekb"]);

    let spb_export = reports.path().join("json").join("spb-santech-ru.json");
    let exported: Vec<ProductRecord> = serde_json::from_str(&std::fs::read_to_string(spb_export).unwrap()).unwrap();
    assert_eq!(exported.len(), 3);

    let aggregate = std::fs::read_to_string(reports.path().join("products.json")).unwrap();
    assert!(aggregate.contains("\"URL товара\": \"https://www.santech.ru/p/1/\""));
    assert!(aggregate.starts_with("[\n    {\n        \"Категория\""));
    assert!(!reports.path().join("json").join("ekb-santech-ru.json").exists());
}

#[tokio::test]
async fn test_second_run_replaces_previous_reports() {
    let reports = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    config.crawler.cities = vec!["spb".to_string()];
    config.crawler.failure_pause_ms = 1;
    config.storage.reports_dir = reports.path().to_path_buf();

    let first = santech_crawler::run_crawl(&config, Arc::new(spb_site())).await.unwrap();
    let second = santech_crawler::run_crawl(&config, Arc::new(spb_site())).await.unwrap();

    assert_eq!(first.total_count, 3);
    assert_eq!(second.total_count, 3);
}
