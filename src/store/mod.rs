/// Key/value storage abstraction over the host's synced and local scopes
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::rc::Rc;

mod chrome;
#[cfg(test)]
pub mod memory;

pub use chrome::ChromeStore;

/// The two storage scopes the extension uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Synced across the user's devices (favorites, settings).
    Sync,
    /// Device-local scratch space (caches).
    Local,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Sync => "sync",
            StorageArea::Local => "local",
        }
    }

    pub fn parse(name: &str) -> Option<StorageArea> {
        match name {
            "sync" => Some(StorageArea::Sync),
            "local" => Some(StorageArea::Local),
            _ => None,
        }
    }
}

/// One changed key, as reported by the host's change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub area: StorageArea,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

pub type ChangeListener = Rc<dyn Fn(&StorageChange)>;

/// Host-provided key/value persistence.
///
/// Every context (page, popup, background) talks to the same underlying store;
/// implementations hold no cached copy of its contents.
#[async_trait(?Send)]
pub trait KeyValueStore {
    /// Fetch the given keys. Absent keys are simply missing from the result.
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StoreError>;

    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StoreError>;

    async fn remove(&self, area: StorageArea, keys: &[&str]) -> Result<(), StoreError>;

    /// Register a listener for changes made by any context, including this one.
    fn on_changed(&self, listener: ChangeListener);
}
