//! Per-city report storage
//!
//! Layout under the reports root:
//!
//! ```text
//! reports/
//!   sqlite/{city}-santech-ru.sqlite   one row per record, pretty JSON text
//!   json/{city}-santech-ru.json       per-city export, JSON array
//!   products.json                     every city's records concatenated
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::domain::catalog::City;
use crate::domain::product_record::ProductRecord;
use crate::domain::repositories::ProductBatchRepository;
use crate::infrastructure::config::StorageConfig;
use crate::infrastructure::database_connection::DatabaseConnection;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialize with 4-space indentation, non-ASCII kept verbatim
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Where the report artifacts of a run live
#[derive(Debug, Clone)]
pub struct ReportsLayout {
    root: PathBuf,
    file_suffix: String,
    aggregate_file_name: String,
}

impl ReportsLayout {
    pub fn new(root: impl Into<PathBuf>, file_suffix: impl Into<String>, aggregate_file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_suffix: file_suffix.into(),
            aggregate_file_name: aggregate_file_name.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.reports_dir, &config.file_suffix, &config.aggregate_file_name)
    }

    /// Create the reports root and its `sqlite/` and `json/` subfolders
    pub async fn ensure(&self) -> Result<(), StorageError> {
        for dir in [self.root.clone(), self.sqlite_dir(), self.json_dir()] {
            fs::create_dir_all(&dir).await.map_err(|e| StorageError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sqlite_dir(&self) -> PathBuf {
        self.root.join("sqlite")
    }

    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }

    pub fn store_path(&self, city: &City) -> PathBuf {
        self.sqlite_dir()
            .join(format!("{}{}.sqlite", city.store_prefix(), self.file_suffix))
    }

    pub fn export_path(&self, city: &City) -> PathBuf {
        self.json_dir()
            .join(format!("{}{}.json", city.store_prefix(), self.file_suffix))
    }

    pub fn aggregate_path(&self) -> PathBuf {
        self.root.join(&self.aggregate_file_name)
    }
}

/// One city's store, opened on first use
type StoreCell = Arc<OnceCell<DatabaseConnection>>;

/// SQLite-backed [`ProductBatchRepository`] plus the run's cleanup and export steps.
/// The map lock only guards the lookup; every city opens and writes its own
/// store without waiting on the others.
pub struct ProductStore {
    layout: ReportsLayout,
    connections: Mutex<HashMap<String, StoreCell>>,
}

impl ProductStore {
    pub fn new(layout: ReportsLayout) -> Self {
        Self {
            layout,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn layout(&self) -> &ReportsLayout {
        &self.layout
    }

    /// Delete the previous run's store and export of every city, and the aggregate export.
    /// Missing files are fine; failures are logged and never stop the run.
    /// Returns the number of files removed.
    pub async fn purge_old_artifacts(&self, cities: &[City]) -> usize {
        let mut targets = Vec::with_capacity(cities.len() * 2 + 1);
        for city in cities {
            targets.push(self.layout.store_path(city));
            targets.push(self.layout.export_path(city));
        }
        targets.push(self.layout.aggregate_path());

        let mut removed = 0;
        for path in targets {
            if !path.exists() {
                continue;
            }
            info!("Remove old data {}...", path.display());
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error when deleting old file {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Write every city's store out as `json/{city}-….json` and all records
    /// together as the aggregate export. Cities without a store are skipped, a
    /// city that fails is logged and skipped. Returns the total record count.
    pub async fn export_all(&self, cities: &[City]) -> Result<usize, StorageError> {
        let mut total: Vec<ProductRecord> = Vec::new();

        for city in cities {
            let store_path = self.layout.store_path(city);
            if !store_path.exists() {
                continue;
            }
            match self.export_city(city).await {
                Ok(records) => total.extend(records),
                Err(e) => warn!("({}) Export failed: {}", city, e),
            }
        }

        let aggregate_path = self.layout.aggregate_path();
        fs::write(&aggregate_path, to_pretty_json(&total)?)
            .await
            .map_err(|e| StorageError::io(&aggregate_path, e))?;
        info!("Wrote {} records to {}", total.len(), aggregate_path.display());

        Ok(total.len())
    }

    async fn export_city(&self, city: &City) -> Result<Vec<ProductRecord>, StorageError> {
        let cell = self.store_cell(city).await;
        let documents = self.open_store(&cell, city).await?.load_documents().await?;

        let records: Vec<ProductRecord> = documents
            .iter()
            .filter_map(|document| match serde_json::from_str(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("({}) Skipping unreadable stored record: {}", city, e);
                    None
                }
            })
            .collect();

        let export_path = self.layout.export_path(city);
        info!("Convert to json {}...", self.layout.store_path(city).display());
        fs::write(&export_path, to_pretty_json(&records)?)
            .await
            .map_err(|e| StorageError::io(&export_path, e))?;

        Ok(records)
    }

    async fn store_cell(&self, city: &City) -> StoreCell {
        let mut connections = self.connections.lock().await;
        Arc::clone(connections.entry(city.slug.clone()).or_default())
    }

    async fn open_store<'c>(
        &self,
        cell: &'c OnceCell<DatabaseConnection>,
        city: &City,
    ) -> Result<&'c DatabaseConnection, StorageError> {
        let path = self.layout.store_path(city);
        cell.get_or_try_init(|| async {
            let connection = DatabaseConnection::open(&path).await?;
            connection.migrate().await?;
            Ok::<_, StorageError>(connection)
        })
        .await
    }

    /// Insert a batch into the city's store; records that fail to serialize are skipped
    pub async fn append_records(&self, city: &City, records: &[ProductRecord]) -> Result<usize, StorageError> {
        let documents: Vec<String> = records
            .iter()
            .filter_map(|record| match to_pretty_json(record) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!("({}) Skipping record that failed to serialize: {}", city, e);
                    None
                }
            })
            .collect();

        let cell = self.store_cell(city).await;
        let connection = self.open_store(&cell, city).await?;
        Ok(connection.insert_documents(&documents).await?)
    }

    /// Close every open store
    pub async fn close(&self) {
        let cells: Vec<StoreCell> = {
            let mut connections = self.connections.lock().await;
            connections.drain().map(|(_, cell)| cell).collect()
        };
        for cell in cells {
            if let Some(connection) = cell.get() {
                connection.close().await;
            }
        }
    }
}

#[async_trait]
impl ProductBatchRepository for ProductStore {
    async fn append_batch(&self, city: &City, records: &[ProductRecord]) -> anyhow::Result<usize> {
        Ok(self.append_records(city, records).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::fields;
    use std::time::Duration;
    use tempfile::tempdir;

    fn layout(root: &Path) -> ReportsLayout {
        ReportsLayout::new(root, "santech-ru", "products.json")
    }

    fn record(url: &str, name: &str) -> ProductRecord {
        let mut record = ProductRecord::new();
        record.insert(fields::NAME, name);
        record.insert(fields::PRODUCT_URL, url);
        record
    }

    #[test]
    fn test_pretty_json_uses_four_spaces_and_keeps_cyrillic() {
        let json = to_pretty_json(&record("https://www.santech.ru/p/1/", "Кран")).unwrap();
        assert_eq!(
            json,
            "{\n    \"Наименование\": \"Кран\",\n    \"URL товара\": \"https://www.santech.ru/p/1/\"\n}"
        );
    }

    #[test]
    fn test_layout_paths() {
        let layout = layout(Path::new("reports"));
        let city = City::new("spb");
        assert_eq!(layout.store_path(&city), Path::new("reports/sqlite/spb-santech-ru.sqlite"));
        assert_eq!(layout.export_path(&city), Path::new("reports/json/spb-santech-ru.json"));
        assert_eq!(layout.aggregate_path(), Path::new("reports/products.json"));
    }

    #[tokio::test]
    async fn test_append_and_export() {
        let dir = tempdir().unwrap();
        let store = ProductStore::new(layout(dir.path()));
        store.layout().ensure().await.unwrap();

        let spb = City::new("spb");
        let ekb = City::new("ekb");
        let written = store
            .append_batch(&spb, &[record("https://www.santech.ru/spb/p/1/", "Кран"), record("https://www.santech.ru/spb/p/2/", "Муфта")])
            .await
            .unwrap();
        assert_eq!(written, 2);
        store.append_batch(&ekb, &[record("https://www.santech.ru/ekb/p/1/", "Тройник")]).await.unwrap();

        let total = store.export_all(&[spb.clone(), ekb.clone(), City::new("nn")]).await.unwrap();
        assert_eq!(total, 3);

        let spb_export: Vec<ProductRecord> =
            serde_json::from_str(&std::fs::read_to_string(store.layout().export_path(&spb)).unwrap()).unwrap();
        assert_eq!(spb_export.len(), 2);
        assert_eq!(spb_export[0].get(fields::NAME), Some("Кран"));
        assert_eq!(spb_export[0].keys().collect::<Vec<_>>(), vec![fields::NAME, fields::PRODUCT_URL]);

        let aggregate: Vec<ProductRecord> =
            serde_json::from_str(&std::fs::read_to_string(store.layout().aggregate_path()).unwrap()).unwrap();
        assert_eq!(aggregate.len(), 3);
        assert_eq!(aggregate[2].get(fields::NAME), Some("Тройник"));
        assert!(!store.layout().export_path(&City::new("nn")).exists());

        store.close().await;
    }

    #[tokio::test]
    async fn test_export_without_stores_writes_empty_aggregate() {
        let dir = tempdir().unwrap();
        let store = ProductStore::new(layout(dir.path()));
        store.layout().ensure().await.unwrap();

        assert_eq!(store.export_all(&City::defaults()).await.unwrap(), 0);
        let aggregate = std::fs::read_to_string(store.layout().aggregate_path()).unwrap();
        assert_eq!(aggregate, "[]");
    }

    #[tokio::test]
    async fn test_purge_removes_stores_and_exports_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let layout = layout(dir.path());
        layout.ensure().await.unwrap();

        let spb = City::new("spb");
        std::fs::write(layout.store_path(&spb), b"old").unwrap();
        std::fs::write(layout.export_path(&spb), b"[]").unwrap();
        std::fs::write(layout.aggregate_path(), b"[]").unwrap();
        let unrelated = layout.json_dir().join("notes.txt");
        std::fs::write(&unrelated, b"keep").unwrap();

        let store = ProductStore::new(layout.clone());
        assert_eq!(store.purge_old_artifacts(&[spb.clone(), City::new("nn")]).await, 3);
        assert!(!layout.store_path(&spb).exists());
        assert!(!layout.export_path(&spb).exists());
        assert!(!layout.aggregate_path().exists());
        assert!(unrelated.exists());

        assert_eq!(store.purge_old_artifacts(&[spb]).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_appends_for_two_cities() {
        let dir = tempdir().unwrap();
        let store = ProductStore::new(layout(dir.path()));
        store.layout().ensure().await.unwrap();

        let spb = City::new("spb");
        let ekb = City::new("ekb");
        let spb_batch = [record("https://www.santech.ru/spb/p/1/", "Кран")];
        let ekb_batch = [record("https://www.santech.ru/ekb/p/1/", "Муфта"), record("https://www.santech.ru/ekb/p/2/", "Тройник")];

        let (spb_written, ekb_written) =
            tokio::join!(store.append_batch(&spb, &spb_batch), store.append_batch(&ekb, &ekb_batch));
        assert_eq!(spb_written.unwrap(), 1);
        assert_eq!(ekb_written.unwrap(), 2);
        assert_eq!(store.export_all(&[spb, ekb]).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_busy_city_store_does_not_block_other_cities() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ProductStore::new(layout(dir.path())));
        store.layout().ensure().await.unwrap();

        let spb = City::new("spb");
        let ekb = City::new("ekb");
        store.append_batch(&spb, &[record("https://www.santech.ru/spb/p/1/", "Кран")]).await.unwrap();

        // take spb's only pooled connection so the next spb write has to wait
        let cell = store.store_cell(&spb).await;
        let held = cell.get().unwrap().pool().acquire().await.unwrap();

        let pending = {
            let store = Arc::clone(&store);
            let spb = spb.clone();
            tokio::spawn(async move {
                store
                    .append_batch(&spb, &[record("https://www.santech.ru/spb/p/2/", "Муфта")])
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ekb_written = tokio::time::timeout(
            Duration::from_secs(2),
            store.append_batch(&ekb, &[record("https://www.santech.ru/ekb/p/1/", "Тройник")]),
        )
        .await
        .expect("ekb write waited on spb");
        assert_eq!(ekb_written.unwrap(), 1);

        drop(held);
        assert_eq!(pending.await.unwrap().unwrap(), 1);
        assert_eq!(store.export_all(&[spb, ekb]).await.unwrap(), 3);
        store.close().await;
    }
}
