use crate::error::{ClinicError, Result};
use crate::storage::DocumentStore;
use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Document store backed by a libSQL database, either a local file or a
/// remote Turso instance.
pub struct LibsqlStore {
    db: Database,
}

impl LibsqlStore {
    /// Connect to `url`. Remote URLs (`libsql://`, `http(s)://`) need an auth token.
    pub async fn connect(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let is_remote = url.starts_with("libsql://") || url.starts_with("http://") || url.starts_with("https://");

        let db = if is_remote {
            let token = auth_token.ok_or_else(|| {
                ClinicError::Config("LIBSQL_AUTH_TOKEN must be set for a remote database".to_string())
            })?;
            info!("Connecting to remote libSQL database at {}", url);
            Builder::new_remote(url.to_string(), token.to_string()).build().await
        } else {
            info!("Opening local libSQL database at {}", url);
            Builder::new_local(url).build().await
        }
        .map_err(|e| ClinicError::storage(format!("Failed to connect to database: {e}")))?;

        let store = Self { db };
        store.run_migrations().await?;
        Ok(store)
    }

    fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| ClinicError::storage(format!("Failed to get database connection: {e}")))
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.connection()?;

        let migration_sql = include_str!("../migrations/001_create_documents.sql");
        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| ClinicError::storage(format!("Failed to run migrations: {e}")))?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

fn parse_data(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl DocumentStore for LibsqlStore {
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<()> {
        let conn = self.connection()?;
        let data = serde_json::to_string(&doc)?;

        conn.execute(
            "INSERT INTO documents (id, collection, data) VALUES (?, ?, ?)",
            libsql::params![id.to_string(), collection, data],
        )
        .await
        .map_err(|e| ClinicError::storage(format!("Failed to insert document: {e}")))?;

        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT data FROM documents WHERE collection = ? AND id = ?",
                libsql::params![collection, id.to_string()],
            )
            .await
            .map_err(|e| ClinicError::storage(format!("Failed to query document: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| ClinicError::storage(format!("Failed to read row: {e}")))?
        {
            Some(row) => {
                let data: String = row
                    .get(0)
                    .map_err(|e| ClinicError::storage(format!("Failed to get data: {e}")))?;
                Ok(Some(parse_data(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, collection: &str, id: Uuid, doc: Value) -> Result<bool> {
        let conn = self.connection()?;
        let data = serde_json::to_string(&doc)?;

        let changed = conn
            .execute(
                "UPDATE documents SET data = ?, updated_at = datetime('now') WHERE collection = ? AND id = ?",
                libsql::params![data, collection, id.to_string()],
            )
            .await
            .map_err(|e| ClinicError::storage(format!("Failed to update document: {e}")))?;

        Ok(changed > 0)
    }

    async fn remove(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let existing = self.get(collection, id).await?;
        if existing.is_none() {
            return Ok(None);
        }

        let conn = self.connection()?;
        conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            libsql::params![collection, id.to_string()],
        )
        .await
        .map_err(|e| ClinicError::storage(format!("Failed to delete document: {e}")))?;

        Ok(existing)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT data FROM documents WHERE collection = ? ORDER BY rowid",
                libsql::params![collection],
            )
            .await
            .map_err(|e| ClinicError::storage(format!("Failed to query documents: {e}")))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ClinicError::storage(format!("Failed to read row: {e}")))?
        {
            let data: String = row
                .get(0)
                .map_err(|e| ClinicError::storage(format!("Failed to get data: {e}")))?;
            results.push(parse_data(&data)?);
        }

        Ok(results)
    }
}
