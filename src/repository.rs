use crate::constants;
use crate::domain::Document;
use crate::error::{ClinicError, Result};
use crate::storage::DocumentStore;
use chrono::Utc;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// `-1` sorts descending, anything else ascending
    pub fn from_flag(flag: Option<i32>) -> Self {
        match flag {
            Some(-1) => SortOrder::Descending,
            _ => SortOrder::Ascending,
        }
    }
}

/// A filtered, sorted, paginated query over one collection
pub struct FindQuery<T> {
    pub filter: Option<Filter<T>>,
    pub sort_by: Option<String>,
    pub order: SortOrder,
    pub skip: usize,
    pub limit: usize,
}

impl<T> Default for FindQuery<T> {
    fn default() -> Self {
        Self {
            filter: None,
            sort_by: None,
            order: SortOrder::Ascending,
            skip: 0,
            limit: constants::DEFAULT_PAGE_LIMIT,
        }
    }
}

impl<T> FindQuery<T> {
    pub fn filter(mut self, filter: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Applies paging and sort parameters. Limits are clamped to
    /// `1..=MAX_PAGE_LIMIT`.
    pub fn page(mut self, skip: Option<usize>, limit: Option<usize>) -> Self {
        self.skip = skip.unwrap_or(0);
        self.limit = limit
            .unwrap_or(constants::DEFAULT_PAGE_LIMIT)
            .clamp(1, constants::MAX_PAGE_LIMIT);
        self
    }

    pub fn sort(mut self, sort_by: Option<String>, order: Option<i32>) -> Self {
        self.sort_by = sort_by.filter(|s| !s.trim().is_empty());
        self.order = SortOrder::from_flag(order);
        self
    }
}

/// One page of results plus the number of matches before pagination
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { results: self.results.into_iter().map(f).collect(), count: self.count }
    }
}

/// Typed access to the documents of `T::COLLECTION`
pub struct Repository<T: Document> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), _marker: PhantomData }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, _marker: PhantomData }
    }

    /// Assigns a fresh id and timestamps, then persists the record
    pub async fn create(&self, record: &mut T) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        record.set_id(id);
        record.set_created_at(now);
        record.set_updated_at(now);

        let doc = serde_json::to_value(&*record)?;
        self.store.insert(T::COLLECTION, id, doc).await?;

        debug!("Created {} record {}", T::COLLECTION, id);
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    async fn all(&self) -> Result<Vec<T>> {
        self.store
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(ClinicError::from))
            .collect()
    }

    pub async fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self.all().await?.into_iter().filter(|r| predicate(r)).collect())
    }

    pub async fn find_one(&self, predicate: impl Fn(&T) -> bool) -> Result<Option<T>> {
        Ok(self.all().await?.into_iter().find(|r| predicate(r)))
    }

    pub async fn exists(&self, predicate: impl Fn(&T) -> bool) -> Result<bool> {
        Ok(self.find_one(predicate).await?.is_some())
    }

    /// Persists changes to an existing record and refreshes `updated_at`
    pub async fn update(&self, record: &mut T) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| ClinicError::Internal(format!("{} record has no id", T::COLLECTION)))?;
        record.set_updated_at(Utc::now());

        let doc = serde_json::to_value(&*record)?;
        if !self.store.replace(T::COLLECTION, id, doc).await? {
            return Err(ClinicError::storage(format!("{} record {} vanished during update", T::COLLECTION, id)));
        }
        Ok(())
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<Option<T>> {
        match self.store.remove(T::COLLECTION, id).await? {
            Some(doc) => {
                debug!("Deleted {} record {}", T::COLLECTION, id);
                Ok(Some(serde_json::from_value(doc)?))
            }
            None => Ok(None),
        }
    }

    pub async fn find_and_count(&self, query: FindQuery<T>) -> Result<Page<T>> {
        if let Some(field) = query.sort_by.as_deref().filter(|f| !T::is_sortable(f)) {
            return Err(ClinicError::BadRequest(format!("Unsupported sort field '{field}'")));
        }

        let mut matches: Vec<T> = match &query.filter {
            Some(filter) => self.all().await?.into_iter().filter(|r| filter(r)).collect(),
            None => self.all().await?,
        };

        if let Some(field) = &query.sort_by {
            let mut keyed = Vec::with_capacity(matches.len());
            for record in matches {
                let key = record
                    .sort_key(field)
                    .ok_or_else(|| ClinicError::BadRequest(format!("Unsupported sort field '{field}'")))?;
                keyed.push((key, record));
            }
            // Stable sort keeps insertion order among equal keys
            keyed.sort_by(|(a, _), (b, _)| match query.order {
                SortOrder::Ascending => a.cmp(b),
                SortOrder::Descending => b.cmp(a),
            });
            matches = keyed.into_iter().map(|(_, record)| record).collect();
        } else if query.order == SortOrder::Descending {
            matches.reverse();
        }

        let count = matches.len();
        let results = matches.into_iter().skip(query.skip).take(query.limit).collect();
        Ok(Page { results, count })
    }
}
