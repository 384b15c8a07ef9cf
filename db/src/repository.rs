use crate::store::{KeyValueStore, StoreError};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed view over one key of a [`KeyValueStore`].
///
/// Every mutation rewrites the whole list through [`KeyValueStore::update`],
/// so concurrent mutations of the same key do not overwrite each other.
pub struct Repository<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _phantom: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _phantom: PhantomData,
        }
    }

    pub async fn all(&self) -> Result<Vec<T>, StoreError> {
        self.store
            .get(self.key)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    pub async fn replace_all(&self, items: &[T]) -> Result<(), StoreError> {
        let values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.store.set(self.key, values).await
    }

    /// Runs `f` on the current items and stores what it leaves behind, as one
    /// step against the store. Returns whatever `f` returns.
    pub async fn update<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<T>) -> R + Send,
        R: Send,
    {
        let mut outcome = None;
        self.store
            .update(
                self.key,
                Box::new(|values: Vec<Value>| -> Result<Vec<Value>, StoreError> {
                    let mut items = values
                        .into_iter()
                        .map(serde_json::from_value)
                        .collect::<Result<Vec<T>, _>>()?;
                    outcome = Some(f(&mut items));
                    Ok(items
                        .iter()
                        .map(serde_json::to_value)
                        .collect::<Result<Vec<_>, _>>()?)
                }),
            )
            .await?;
        outcome.ok_or_else(|| StoreError::UpdateNotApplied(self.key.to_owned()))
    }

    pub async fn find<P>(&self, predicate: P) -> Result<Option<T>, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|item| predicate(item)))
    }

    pub async fn filter<P>(&self, predicate: P) -> Result<Vec<T>, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|item| predicate(item))
            .collect())
    }

    /// Whether the key has ever been written, even with an empty list.
    pub async fn is_initialized(&self) -> Result<bool, StoreError> {
        self.store.contains(self.key).await
    }
}
