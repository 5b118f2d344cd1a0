/// Constants and runtime settings for the Qeseh Mjeed extension
use crate::error::StoreError;
use crate::store::{KeyValueStore, StorageArea};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SITE_BASE_URL: &str = "https://wwv.qeseh.com";
pub const SITE_DOMAIN: &str = "qeseh.com";
pub const SITE_PATTERN: &str = "*://wwv.qeseh.com/*";

/// Storage keys
pub const FAVORITES_KEY: &str = "qesehFavorites";
pub const CACHE_KEY: &str = "qesehCache";
pub const STATS_KEY: &str = "stats";

/// URL path markers used for page classification
pub const WATCH_PATH: &str = "/watch";
pub const MOVIE_PATH: &str = "/movies/";
pub const SERIES_PATH: &str = "/series/";

/// DOM markers
pub const SERIES_INFO_SELECTOR: &str = ".singleSeries";
pub const SERIES_HEADING_SELECTOR: &str = ".singleInfo h1";
pub const SINGLE_POST_CLASS: &str = "single-post";
pub const ITEM_CARD_SELECTOR: &str = ".block-post";
pub const BROWSING_CLASS: &str = "mjeed-browsing";
pub const IN_LIST_CLASS: &str = "in-list";

/// Runtime settings, stored as individual keys in the synced scope.
///
/// Every field has a default so a partially populated store (or one written
/// by an older version) still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub design_enabled: bool,
    pub series_page_enabled: bool,
    pub debug_logging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_install: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            design_enabled: true,
            series_page_enabled: true,
            debug_logging: false,
            version: None,
            first_install: None,
            last_update: None,
        }
    }
}

impl Settings {
    const KEYS: [&'static str; 6] = [
        "designEnabled",
        "seriesPageEnabled",
        "debugLogging",
        "version",
        "firstInstall",
        "lastUpdate",
    ];

    /// Read settings from the synced scope, falling back to defaults on any failure.
    pub async fn load(store: &dyn KeyValueStore) -> Settings {
        Self::try_load(store).await.unwrap_or_else(|e| {
            log::error!("Failed to load settings: {}", e);
            Settings::default()
        })
    }

    pub async fn try_load(store: &dyn KeyValueStore) -> Result<Settings, StoreError> {
        let values = store.get(StorageArea::Sync, &Self::KEYS).await?;
        Ok(Self::from_values(values))
    }

    /// Write only `designEnabled`, leaving every other setting as stored.
    pub async fn store_design(store: &dyn KeyValueStore, enabled: bool) -> Result<(), StoreError> {
        let mut items = Map::new();
        items.insert("designEnabled".to_string(), Value::Bool(enabled));
        store.set(StorageArea::Sync, items).await
    }

    /// Write only `version` and `lastUpdate`.
    pub async fn store_update(store: &dyn KeyValueStore, version: &str, now: f64) -> Result<(), StoreError> {
        let mut items = Map::new();
        items.insert("version".to_string(), Value::from(version));
        items.insert("lastUpdate".to_string(), Value::from(now));
        store.set(StorageArea::Sync, items).await
    }

    fn from_values(values: Map<String, Value>) -> Settings {
        // Drop nulls so serde falls back to the field default instead of failing.
        let values: Map<String, Value> = values.into_iter().filter(|(_, v)| !v.is_null()).collect();
        serde_json::from_value(Value::Object(values)).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed settings: {}", e);
            Settings::default()
        })
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        match serde_json::to_value(self).map_err(|e| StoreError::Encode(e.to_string()))? {
            Value::Object(items) => store.set(StorageArea::Sync, items).await,
            other => Err(StoreError::Encode(format!("settings encoded as {}", other))),
        }
    }

    pub fn log_level(&self) -> log::Level {
        if self.debug_logging {
            log::Level::Debug
        } else {
            log::Level::Info
        }
    }
}

/// Activation counters kept under the `stats` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub activations: u64,
    pub last_used: f64,
    pub first_used: f64,
}

impl UsageStats {
    pub fn new(now: f64) -> Self {
        UsageStats {
            activations: 0,
            last_used: now,
            first_used: now,
        }
    }

    pub fn record(&mut self, now: f64) {
        self.activations += 1;
        self.last_used = now;
    }
}
