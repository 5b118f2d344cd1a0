/// Favorites repository over the shared key/value store
use crate::config::{CACHE_KEY, FAVORITES_KEY};
use crate::error::StoreError;
use crate::favorites::{FavoriteItem, FavoritesList, IdentityKey};
use crate::store::{KeyValueStore, StorageArea};
use crate::sync::LocalNotifier;
use serde_json::{Map, Value};
use std::rc::Rc;

/// Outcome of a toggle: whether the item ended up in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    pub added: bool,
}

/// The only writer of the favorites key.
///
/// Holds a handle to the store, never a copy of the list: every operation reads
/// the current value first. Read-then-write is not atomic across contexts, so
/// two tabs toggling the same item at once can both insert; the store keeps
/// whichever write lands last.
pub struct FavoritesRepository {
    store: Rc<dyn KeyValueStore>,
    notifier: LocalNotifier,
}

impl FavoritesRepository {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        FavoritesRepository {
            store,
            notifier: LocalNotifier::new(),
        }
    }

    pub fn store(&self) -> &Rc<dyn KeyValueStore> {
        &self.store
    }

    /// Fires after every successful mutation made through this repository.
    pub fn notifier(&self) -> &LocalNotifier {
        &self.notifier
    }

    /// The stored list, or an empty one if the key is absent or unreadable.
    pub async fn get_all(&self) -> FavoritesList {
        match self.load().await {
            Ok(list) => list,
            Err(e) => {
                log::error!("Error getting favorites: {}", e);
                FavoritesList::new()
            }
        }
    }

    /// Append `item` unless an entry already matches its URL or title.
    ///
    /// Returns `Ok(false)` for a duplicate; nothing is written in that case.
    pub async fn add(&self, item: FavoriteItem) -> Result<bool, StoreError> {
        let mut list = self.load().await?;
        if !list.push_unique(item) {
            log::debug!("Favorite already present, not adding");
            return Ok(false);
        }
        self.save(&list).await?;
        Ok(true)
    }

    /// Delete every entry with exactly this URL. Returns whether anything was removed.
    pub async fn remove(&self, series_url: &str) -> Result<bool, StoreError> {
        let mut list = self.load().await?;
        if !list.remove_url(series_url) {
            return Ok(false);
        }
        self.save(&list).await?;
        Ok(true)
    }

    /// Remove the first entry matching `key`, or insert `item` when none does.
    pub async fn toggle(&self, key: &IdentityKey, item: FavoriteItem) -> Result<Toggled, StoreError> {
        let mut list = self.load().await?;
        let added = list.toggle(key, item);
        self.save(&list).await?;
        log::debug!("Toggled favorite {:?}: added={}", key.title, added);
        Ok(Toggled { added })
    }

    /// Overwrite the whole list, as the background `saveFavorites` message does.
    pub async fn replace_all(&self, list: &FavoritesList) -> Result<(), StoreError> {
        self.save(list).await
    }

    /// Drop the favorites key and the local cache key.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(StorageArea::Sync, &[FAVORITES_KEY]).await?;
        self.store.remove(StorageArea::Local, &[CACHE_KEY]).await?;
        self.notifier.notify();
        Ok(())
    }

    async fn load(&self) -> Result<FavoritesList, StoreError> {
        let mut values = self.store.get(StorageArea::Sync, &[FAVORITES_KEY]).await?;

        match values.remove(FAVORITES_KEY) {
            None | Some(Value::Null) => Ok(FavoritesList::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| StoreError::Decode {
                key: FAVORITES_KEY.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn save(&self, list: &FavoritesList) -> Result<(), StoreError> {
        let value = serde_json::to_value(list).map_err(|e| StoreError::Encode(e.to_string()))?;

        let mut items = Map::new();
        items.insert(FAVORITES_KEY.to_string(), value);
        self.store.set(StorageArea::Sync, items).await?;

        self.notifier.notify();
        Ok(())
    }
}
