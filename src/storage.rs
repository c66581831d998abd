use crate::config::DatabaseConfig;
use crate::error::{ClinicError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Storage trait for persisting JSON documents grouped by collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<()>;
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>>;
    /// Overwrites an existing document. Returns false if `id` is unknown.
    async fn replace(&self, collection: &str, id: Uuid, doc: Value) -> Result<bool>;
    async fn remove(&self, collection: &str, id: Uuid) -> Result<Option<Value>>;
    /// Every document of the collection, in insertion order
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;
}

#[derive(Default)]
struct Collection {
    order: Vec<Uuid>,
    docs: HashMap<Uuid, Value>,
}

/// In-memory storage implementation for development/testing
#[derive(Default, Clone)]
pub struct InMemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .lock()
            .map_err(|e| ClinicError::storage(format!("in-memory store lock poisoned: {e}")))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<()> {
        let mut collections = self.lock()?;
        let entry = collections.entry(collection.to_string()).or_default();
        if entry.docs.insert(id, doc).is_none() {
            entry.order.push(id);
        }

        debug!("Inserted {} document {}", collection, id);
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let collections = self.lock()?;
        Ok(collections.get(collection).and_then(|c| c.docs.get(&id)).cloned())
    }

    async fn replace(&self, collection: &str, id: Uuid, doc: Value) -> Result<bool> {
        let mut collections = self.lock()?;
        match collections.get_mut(collection).and_then(|c| c.docs.get_mut(&id)) {
            Some(existing) => {
                *existing = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let mut collections = self.lock()?;
        let Some(entry) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let removed = entry.docs.remove(&id);
        if removed.is_some() {
            entry.order.retain(|existing| *existing != id);
            debug!("Removed {} document {}", collection, id);
        }
        Ok(removed)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|c| c.order.iter().filter_map(|id| c.docs.get(id).cloned()).collect())
            .unwrap_or_default())
    }
}

/// Opens the configured store: libSQL when a database URL is set, the
/// in-memory store otherwise.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.url.as_deref() {
        #[cfg(feature = "db")]
        Some(url) => {
            let store = crate::db::LibsqlStore::connect(url, config.auth_token.as_deref()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db"))]
        Some(url) => Err(ClinicError::Config(format!(
            "database url '{url}' is set but this build lacks the `db` feature"
        ))),
        None => {
            info!("No database configured, records are kept in memory");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
