/// In-process store that behaves like the host store, including change events
use super::{ChangeListener, KeyValueStore, StorageArea, StorageChange};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<(StorageArea, String), Value>>,
    listeners: RefCell<Vec<ChangeListener>>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn raw(&self, area: StorageArea, key: &str) -> Option<Value> {
        self.values.borrow().get(&(area, key.to_string())).cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("QUOTA_BYTES_PER_ITEM quota exceeded".to_string()));
        }
        Ok(())
    }

    fn emit(&self, changes: Vec<StorageChange>) {
        // Clone out so listeners may touch the store again.
        let listeners: Vec<ChangeListener> = self.listeners.borrow().clone();
        for change in &changes {
            for listener in &listeners {
                listener(change);
            }
        }
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        if self.fail_reads.get() {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }

        let values = self.values.borrow();
        Ok(keys
            .iter()
            .filter_map(|key| {
                values
                    .get(&(area, key.to_string()))
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect())
    }

    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StoreError> {
        self.check_writable()?;

        let mut changes = Vec::new();
        {
            let mut values = self.values.borrow_mut();
            for (key, value) in items {
                let old_value = values.insert((area, key.clone()), value.clone());
                if old_value.as_ref() != Some(&value) {
                    changes.push(StorageChange {
                        area,
                        key,
                        old_value,
                        new_value: Some(value),
                    });
                }
            }
        }

        self.emit(changes);
        Ok(())
    }

    async fn remove(&self, area: StorageArea, keys: &[&str]) -> Result<(), StoreError> {
        self.check_writable()?;

        let changes: Vec<StorageChange> = {
            let mut values = self.values.borrow_mut();
            keys.iter()
                .filter_map(|key| {
                    values
                        .remove(&(area, key.to_string()))
                        .map(|old_value| StorageChange {
                            area,
                            key: key.to_string(),
                            old_value: Some(old_value),
                            new_value: None,
                        })
                })
                .collect()
        };

        self.emit(changes);
        Ok(())
    }

    fn on_changed(&self, listener: ChangeListener) {
        self.listeners.borrow_mut().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use std::rc::Rc;

    fn items(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    #[test]
    fn test_get_missing_key() {
        let store = MemoryStore::new();

        let values = block_on(store.get(StorageArea::Sync, &["missing"])).unwrap();

        assert!(values.is_empty());
    }

    #[test]
    fn test_scopes_are_separate() {
        let store = MemoryStore::new();
        block_on(store.set(StorageArea::Local, items("k", json!(1)))).unwrap();

        assert!(block_on(store.get(StorageArea::Sync, &["k"])).unwrap().is_empty());
        assert_eq!(block_on(store.get(StorageArea::Local, &["k"])).unwrap()["k"], json!(1));
    }

    #[test]
    fn test_change_events_only_for_real_changes() {
        let store = MemoryStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            store.on_changed(Rc::new(move |change: &StorageChange| {
                seen.borrow_mut().push(change.clone());
            }));
        }

        block_on(store.set(StorageArea::Sync, items("k", json!([1])))).unwrap();
        block_on(store.set(StorageArea::Sync, items("k", json!([1])))).unwrap();
        block_on(store.remove(StorageArea::Sync, &["k"])).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].old_value, None);
        assert_eq!(seen[0].new_value, Some(json!([1])));
        assert_eq!(seen[1].old_value, Some(json!([1])));
        assert_eq!(seen[1].new_value, None);
    }

    #[test]
    fn test_failed_write_leaves_value() {
        let store = MemoryStore::new();
        block_on(store.set(StorageArea::Sync, items("k", json!(1)))).unwrap();
        store.fail_writes(true);

        assert!(block_on(store.set(StorageArea::Sync, items("k", json!(2)))).is_err());
        assert_eq!(store.raw(StorageArea::Sync, "k"), Some(json!(1)));
    }
}
