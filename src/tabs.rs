/// Tab and context-menu operations, reached through the JS bridge
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn activeTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendToTab(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(url: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn reloadTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createContextMenus(menus: JsValue) -> Result<(), JsValue>;
}

/// Information about a browser tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: i32,
    #[serde(default)]
    pub url: Option<String>,
}

impl TabInfo {
    pub fn is_on_site(&self, domain: &str) -> bool {
        self.url.as_deref().is_some_and(|url| url.contains(domain))
    }
}

/// A context-menu entry to register at install/update time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDefinition {
    pub id: String,
    pub title: String,
    pub contexts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url_patterns: Option<Vec<String>>,
}

/// Browser tab operations the background worker needs.
#[async_trait(?Send)]
pub trait TabHost {
    async fn active_tab(&self) -> Result<Option<TabInfo>, String>;
    async fn all_tabs(&self) -> Result<Vec<TabInfo>, String>;
    async fn send_message(&self, tab_id: i32, message: Value) -> Result<Value, String>;
    async fn create_tab(&self, url: &str) -> Result<(), String>;
    async fn reload_tab(&self, tab_id: i32) -> Result<(), String>;
    async fn install_menus(&self, menus: &[MenuDefinition]) -> Result<(), String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeTabs;

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

#[async_trait(?Send)]
impl TabHost for ChromeTabs {
    async fn active_tab(&self) -> Result<Option<TabInfo>, String> {
        let tab_js = activeTab()
            .await
            .map_err(|e| format!("Failed to query active tab: {:?}", e))?;
        if tab_js.is_null() || tab_js.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(tab_js)
            .map(Some)
            .map_err(|e| format!("Failed to parse tab: {:?}", e))
    }

    async fn all_tabs(&self) -> Result<Vec<TabInfo>, String> {
        let tabs_js = queryTabs()
            .await
            .map_err(|e| format!("Failed to query tabs: {:?}", e))?;
        serde_wasm_bindgen::from_value(tabs_js).map_err(|e| format!("Failed to parse tabs: {:?}", e))
    }

    async fn send_message(&self, tab_id: i32, message: Value) -> Result<Value, String> {
        let reply = sendToTab(tab_id, to_js(&message)?)
            .await
            .map_err(|e| format!("Could not send message to tab {}: {:?}", tab_id, e))?;
        if reply.is_null() || reply.is_undefined() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(reply).map_err(|e| format!("Failed to parse reply: {:?}", e))
    }

    async fn create_tab(&self, url: &str) -> Result<(), String> {
        createTab(url)
            .await
            .map_err(|e| format!("Failed to open tab: {:?}", e))
    }

    async fn reload_tab(&self, tab_id: i32) -> Result<(), String> {
        reloadTab(tab_id)
            .await
            .map_err(|e| format!("Failed to reload tab {}: {:?}", tab_id, e))
    }

    async fn install_menus(&self, menus: &[MenuDefinition]) -> Result<(), String> {
        createContextMenus(to_js(menus)?)
            .await
            .map_err(|e| format!("Error creating context menus: {:?}", e))
    }
}
