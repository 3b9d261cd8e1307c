// Database connection and pool management
// One SQLite file per city store, each holding a single `json_data` table

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::warn;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (creating if needed) the SQLite file at `path`
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete);

        // Writes to one store are sequential, a single connection is enough
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS json_data (id INTEGER PRIMARY KEY, data TEXT)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert each document as its own row in one transaction.
    /// A row that fails to insert is logged and skipped; returns the rows written.
    pub async fn insert_documents(&self, documents: &[String]) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for document in documents {
            match sqlx::query("INSERT INTO json_data (data) VALUES (?)")
                .bind(document)
                .execute(&mut *tx)
                .await
            {
                Ok(_) => written += 1,
                Err(e) => warn!("Skipping record that failed to insert: {}", e),
            }
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Every stored document in insertion order
    pub async fn load_documents(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT data FROM json_data ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<Option<String>, _>("data").ok().flatten())
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<(), sqlx::Error> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("sqlite").join("spb-santech-ru.sqlite");

        let db = DatabaseConnection::open(&db_path).await?;
        db.migrate().await?;
        assert!(db_path.exists());

        // migrate is idempotent
        db.migrate().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_documents_round_trip_in_order() -> Result<(), sqlx::Error> {
        let temp_dir = tempdir()?;
        let db = DatabaseConnection::open(&temp_dir.path().join("store.sqlite")).await?;
        db.migrate().await?;

        let written = db
            .insert_documents(&["{\"a\": \"1\"}".to_string(), "{\"b\": \"2\"}".to_string()])
            .await?;
        assert_eq!(written, 2);
        db.insert_documents(&["{\"c\": \"3\"}".to_string()]).await?;

        let documents = db.load_documents().await?;
        assert_eq!(documents, vec!["{\"a\": \"1\"}", "{\"b\": \"2\"}", "{\"c\": \"3\"}"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_null_rows_are_skipped_on_load() -> Result<(), sqlx::Error> {
        let temp_dir = tempdir()?;
        let db = DatabaseConnection::open(&temp_dir.path().join("store.sqlite")).await?;
        db.migrate().await?;
        sqlx::query("INSERT INTO json_data (data) VALUES (NULL)").execute(db.pool()).await?;
        db.insert_documents(&["{}".to_string()]).await?;

        assert_eq!(db.load_documents().await?, vec!["{}"]);
        Ok(())
    }
}
