//! Typed, persisted collections

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::backend::StorageBackend;
use super::StoreError;

/// Drop later duplicates, keeping the first occurrence of each value
pub fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.contains(&item) {
            kept.push(item);
        }
    }
    kept
}

/// A named list persisted as one JSON array
///
/// Reads return the list deduplicated by value. Mutations are
/// read-modify-write cycles serialized by an internal lock, so concurrent
/// pushes from the scheduler and user actions never lose entries.
pub struct HighlightStore<T> {
    key: String,
    backend: Arc<dyn StorageBackend>,
    guard: Mutex<()>,
    _item: PhantomData<fn() -> T>,
}

impl<T> HighlightStore<T>
where
    T: Serialize + DeserializeOwned + PartialEq + Send,
{
    pub fn new(key: impl Into<String>, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            key: key.into(),
            backend,
            guard: Mutex::new(()),
            _item: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current contents; an absent record reads as empty
    pub async fn get(&self) -> Result<Vec<T>, StoreError> {
        let _guard = self.guard.lock().await;
        self.read().await
    }

    /// Replace the contents
    pub async fn set(&self, items: Vec<T>) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        self.write(&items).await
    }

    /// Append one entry
    pub async fn push(&self, item: T) -> Result<(), StoreError> {
        self.update(|mut items| {
            items.push(item);
            items
        })
        .await
    }

    /// Append several entries in order
    pub async fn push_all(&self, new_items: Vec<T>) -> Result<(), StoreError> {
        if new_items.is_empty() {
            return Ok(());
        }
        self.update(|mut items| {
            items.extend(new_items);
            items
        })
        .await
    }

    /// Delete the entry at `index`
    ///
    /// `None`, an out-of-range index, or an empty store leave the store
    /// untouched. Returns whether an entry was removed.
    pub async fn remove(&self, index: Option<usize>) -> Result<bool, StoreError> {
        let Some(index) = index else {
            return Ok(false);
        };

        let _guard = self.guard.lock().await;
        let mut items = self.read().await?;
        if index >= items.len() {
            return Ok(false);
        }
        items.remove(index);
        self.write(&items).await?;
        Ok(true)
    }

    /// Atomically rewrite the contents with `f`
    pub async fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(Vec<T>) -> Vec<T> + Send,
    {
        let _guard = self.guard.lock().await;
        let items = self.read().await?;
        self.write(&f(items)).await
    }

    async fn read(&self) -> Result<Vec<T>, StoreError> {
        let Some(raw) = self.backend.load(&self.key).await? else {
            return Ok(Vec::new());
        };
        let items: Vec<T> = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            key: self.key.clone(),
            source,
        })?;
        Ok(dedup(items))
    }

    async fn write(&self, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        self.backend.save(&self.key, &raw).await
    }
}

impl<T> std::fmt::Debug for HighlightStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightStore").field("key", &self.key).finish()
    }
}
