/// Mjeed - Chrome extension that re-skins qeseh.com and keeps a synced "My List"
/// Built with Rust + WASM + Yew

pub mod background;
pub mod browser;
pub mod config;
pub mod content;
pub mod error;
pub mod favorites;
pub mod messages;
pub mod normalize;
pub mod page;
pub mod repository;
pub mod store;
pub mod sync;
pub mod tabs;
pub mod ui;

use background::{Background, InstallReason, MenuItem};
use serde::Serialize;
use std::rc::Rc;
use store::ChromeStore;
use tabs::{ChromeTabs, TabInfo};
use wasm_bindgen::prelude::*;

#[cfg(all(test, target_arch = "wasm32"))]
wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

thread_local! {
    static BACKGROUND: Rc<Background> = Rc::new(Background::new(Rc::new(ChromeStore::new()), Rc::new(ChromeTabs)));
}

fn background() -> Rc<Background> {
    BACKGROUND.with(Rc::clone)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
    // Narrowed again once stored settings are read
    log::set_max_level(log::LevelFilter::Info);
}

/// Apply the stored `debugLogging` preference to the global log level.
async fn apply_log_level() {
    let settings = config::Settings::load(&ChromeStore::new()).await;
    log::set_max_level(settings.log_level().to_level_filter());
}

#[wasm_bindgen]
pub fn normalize_series_url(url: &str) -> String {
    normalize::normalize_series_url(url)
}

#[wasm_bindgen]
pub fn normalize_series_title(title: &str) -> String {
    normalize::normalize_series_title(title)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    wasm_bindgen_futures::spawn_local(apply_log_level());
    yew::Renderer::<ui::popup::App>::new().render();
}

#[wasm_bindgen]
pub fn start_content_script() -> Result<(), JsValue> {
    content::ContentScript::start().map(|_| ())
}

#[wasm_bindgen]
pub async fn start_background() {
    apply_log_level().await;
    background().record_activation(js_sys::Date::now()).await;
}

#[wasm_bindgen]
pub async fn handle_background_message(request: JsValue) -> Result<JsValue, JsValue> {
    let request: serde_json::Value = serde_wasm_bindgen::from_value(request).unwrap_or(serde_json::Value::Null);
    let reply = background().handle_message(request).await;
    to_js(&reply)
}

#[wasm_bindgen]
pub async fn on_installed(reason: String) {
    background()
        .on_installed(InstallReason::parse(&reason), js_sys::Date::now())
        .await;
}

#[wasm_bindgen]
pub async fn on_menu_clicked(menu_id: String, tab: JsValue) {
    let Some(item) = MenuItem::parse(&menu_id) else {
        log::debug!("Ignoring unknown menu item {}", menu_id);
        return;
    };
    let tab: Option<TabInfo> = serde_wasm_bindgen::from_value(tab).ok().flatten();
    background().on_menu_clicked(item, tab).await;
}

#[wasm_bindgen]
pub async fn on_command(command: String) {
    background().on_command(&command).await;
}
