//! Domain module - Core catalog entities and repository interfaces
//!
//! Each module is its own file in the domain/ directory; the commonly used
//! items are re-exported here for convenience.

pub mod catalog;
pub mod constants;
pub mod product_record;
pub mod repositories;

pub use catalog::{CatalogLink, City};
pub use product_record::{ProductRecord, SeenProducts};
pub use repositories::ProductBatchRepository;
