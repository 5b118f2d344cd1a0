/// `chrome.storage` backed store, reached through the JS bridge
use super::{ChangeListener, KeyValueStore, StorageArea, StorageChange};
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn storageGet(area: &str, keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSet(area: &str, items: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageRemove(area: &str, keys: JsValue) -> Result<(), JsValue>;

    fn onStorageChanged(callback: &Closure<dyn FnMut(String, JsValue)>);
}

/// Shape of each entry the bridge passes to the change callback.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChange {
    key: String,
    #[serde(default)]
    old_value: Option<Value>,
    #[serde(default)]
    new_value: Option<Value>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeStore;

impl ChromeStore {
    pub fn new() -> Self {
        ChromeStore
    }
}

/// Objects must cross as plain JS objects, not `Map`s.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, StoreError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| StoreError::Encode(e.to_string()))
}

#[async_trait(?Send)]
impl KeyValueStore for ChromeStore {
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        let result = storageGet(area.as_str(), to_js(&keys)?)
            .await
            .map_err(|e| StoreError::from_js("get", e))?;

        if result.is_null() || result.is_undefined() {
            return Ok(Map::new());
        }

        serde_wasm_bindgen::from_value(result).map_err(|e| StoreError::Decode {
            key: keys.join(","),
            message: e.to_string(),
        })
    }

    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StoreError> {
        storageSet(area.as_str(), to_js(&items)?)
            .await
            .map_err(|e| StoreError::from_js("set", e))
    }

    async fn remove(&self, area: StorageArea, keys: &[&str]) -> Result<(), StoreError> {
        storageRemove(area.as_str(), to_js(&keys)?)
            .await
            .map_err(|e| StoreError::from_js("remove", e))
    }

    fn on_changed(&self, listener: ChangeListener) {
        let callback = Closure::wrap(Box::new(move |area_name: String, changes: JsValue| {
            let Some(area) = StorageArea::parse(&area_name) else {
                return;
            };

            let changes: Vec<RawChange> = match serde_wasm_bindgen::from_value(changes) {
                Ok(changes) => changes,
                Err(e) => {
                    log::warn!("Ignoring malformed storage change: {}", e);
                    return;
                }
            };

            for change in changes {
                listener(&StorageChange {
                    area,
                    key: change.key,
                    old_value: change.old_value,
                    new_value: change.new_value,
                });
            }
        }) as Box<dyn FnMut(String, JsValue)>);

        onStorageChanged(&callback);
        // Listeners live as long as the extension context.
        callback.forget();
    }
}
