//! Infrastructure layer: HTTP fetching, HTML parsing, report storage,
//! configuration and logging

pub mod config;
pub mod database_connection;
pub mod html_node;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod product_store;
pub mod simple_http_client;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use html_node::{PageDocument, PageNode};
pub use logging::{init_logging, init_logging_with_config};
pub use parsing::{CatalogParser, ParsingConfig, ParsingError, ParsingResult, ProductPageParser};
pub use product_store::{ProductStore, ReportsLayout, StorageError};
pub use simple_http_client::{FetchError, HttpClient, HttpClientConfig, PageFetcher};
