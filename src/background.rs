/// Background service worker: message handling, lifecycle, context menus
use crate::config::{SITE_BASE_URL, SITE_DOMAIN, SITE_PATTERN, STATS_KEY, Settings, UsageStats, VERSION};
use crate::error::StoreError;
use crate::messages::{BackgroundCommand, ContentCommand, Response};
use crate::repository::FavoritesRepository;
use crate::store::{KeyValueStore, StorageArea};
use crate::tabs::{MenuDefinition, TabHost, TabInfo};
use serde_json::{Map, Value};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    Other,
}

impl InstallReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "install" => InstallReason::Install,
            "update" => InstallReason::Update,
            _ => InstallReason::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    AddToFavorites,
    ViewFavorites,
    OpenSite,
    ToggleDesign,
}

impl MenuItem {
    pub fn id(&self) -> &'static str {
        match self {
            MenuItem::AddToFavorites => "addToFavorites",
            MenuItem::ViewFavorites => "viewFavorites",
            MenuItem::OpenSite => "openQeseh",
            MenuItem::ToggleDesign => "toggleNetflixDesign",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        [
            MenuItem::AddToFavorites,
            MenuItem::ViewFavorites,
            MenuItem::OpenSite,
            MenuItem::ToggleDesign,
        ]
        .into_iter()
        .find(|item| item.id() == id)
    }

    fn title(&self) -> &'static str {
        match self {
            MenuItem::AddToFavorites => "إضافة إلى المفضلة",
            MenuItem::ViewFavorites => "عرض قائمتي",
            MenuItem::OpenSite => "فتح قصة عشق",
            MenuItem::ToggleDesign => "تبديل تصميم Netflix",
        }
    }

    fn definition(&self) -> MenuDefinition {
        let site_only = matches!(self, MenuItem::AddToFavorites | MenuItem::ViewFavorites);
        MenuDefinition {
            id: self.id().to_string(),
            title: self.title().to_string(),
            contexts: vec![if site_only { "page" } else { "all" }.to_string()],
            document_url_patterns: site_only.then(|| vec![SITE_PATTERN.to_string()]),
        }
    }
}

/// Favorites entries only on the site; the rest everywhere.
pub fn menu_definitions() -> Vec<MenuDefinition> {
    [
        MenuItem::AddToFavorites,
        MenuItem::ViewFavorites,
        MenuItem::OpenSite,
        MenuItem::ToggleDesign,
    ]
    .iter()
    .map(MenuItem::definition)
    .collect()
}

pub const TOGGLE_DESIGN_COMMAND: &str = "toggle-design";

pub struct Background {
    store: Rc<dyn KeyValueStore>,
    repo: FavoritesRepository,
    tabs: Rc<dyn TabHost>,
}

impl Background {
    pub fn new(store: Rc<dyn KeyValueStore>, tabs: Rc<dyn TabHost>) -> Self {
        Background {
            repo: FavoritesRepository::new(store.clone()),
            store,
            tabs,
        }
    }

    /// Answer a runtime message. Always produces a reply.
    pub async fn handle_message(&self, request: Value) -> Value {
        match BackgroundCommand::parse(request) {
            Ok(command) => self.dispatch(command).await.to_value(),
            Err(e) => {
                log::warn!("Rejected message: {}", e);
                Response::error(&e).to_value()
            }
        }
    }

    pub async fn dispatch(&self, command: BackgroundCommand) -> Response {
        match command {
            BackgroundCommand::GetFavorites => Response::Favorites {
                favorites: self.repo.get_all().await,
                error: None,
            },
            BackgroundCommand::SaveFavorites(list) => {
                let result = self.repo.replace_all(&list).await;
                if let Err(e) = &result {
                    log::error!("Error saving favorites: {}", e);
                }
                Response::saved(result)
            }
            BackgroundCommand::GetStatus => Response::Status {
                enabled: Settings::load(self.store.as_ref()).await.design_enabled,
            },
            BackgroundCommand::ToggleDesign { enabled } => Response::saved(self.set_design(enabled).await),
            BackgroundCommand::LogEvent { event, data } => {
                log::info!("Event: {} {}", event, data);
                Response::Received { received: true }
            }
        }
    }

    /// Persist the design flag and tell every open site tab to re-apply it.
    pub async fn set_design(&self, enabled: bool) -> Result<(), StoreError> {
        Settings::store_design(self.store.as_ref(), enabled).await?;

        match self.tabs.all_tabs().await {
            Ok(tabs) => {
                let message = ContentCommand::RefreshDesign { enabled }.to_value();
                for tab in tabs.iter().filter(|tab| tab.is_on_site(SITE_DOMAIN)) {
                    // Tabs without a content script reject the message; that is fine.
                    if let Err(e) = self.tabs.send_message(tab.id, message.clone()).await {
                        log::debug!("{}", e);
                    }
                }
            }
            Err(e) => log::warn!("{}", e),
        }
        Ok(())
    }

    async fn flip_design(&self) -> Result<bool, StoreError> {
        // A failed read must not turn into a write of the default.
        let enabled = !Settings::try_load(self.store.as_ref()).await?.design_enabled;
        Settings::store_design(self.store.as_ref(), enabled).await?;
        Ok(enabled)
    }

    pub async fn on_installed(&self, reason: InstallReason, now: f64) {
        let result = match reason {
            InstallReason::Install => {
                log::info!("Qeseh Netflix Extension installed");
                let settings = Settings {
                    version: Some(VERSION.to_string()),
                    first_install: Some(now),
                    ..Settings::default()
                };
                settings.save(self.store.as_ref()).await
            }
            InstallReason::Update => {
                log::info!("Qeseh Netflix Extension updated to {}", VERSION);
                Settings::store_update(self.store.as_ref(), VERSION, now).await
            }
            InstallReason::Other => return,
        };

        if let Err(e) = result {
            log::error!("Error during installation/update: {}", e);
        }

        match self.tabs.install_menus(&menu_definitions()).await {
            Ok(()) => log::info!("Context menus created"),
            Err(e) => log::error!("{}", e),
        }

        if reason == InstallReason::Install {
            if let Err(e) = self.tabs.create_tab(SITE_BASE_URL).await {
                log::error!("{}", e);
            }
        }
    }

    pub async fn on_menu_clicked(&self, item: MenuItem, tab: Option<TabInfo>) {
        let result = match (item, tab) {
            (MenuItem::ViewFavorites, Some(tab)) => self
                .tabs
                .send_message(tab.id, ContentCommand::OpenFavorites.to_value())
                .await
                .map(|_| ()),
            (MenuItem::AddToFavorites, Some(tab)) => self
                .tabs
                .send_message(tab.id, ContentCommand::AddCurrentToFavorites.to_value())
                .await
                .map(|_| ()),
            (MenuItem::OpenSite, _) => self.tabs.create_tab(SITE_BASE_URL).await,
            (MenuItem::ToggleDesign, tab) => self.toggle_and_reload(tab).await,
            (item, None) => Err(format!("Menu {} clicked without a tab", item.id())),
        };

        if let Err(e) = result {
            log::warn!("{}", e);
        }
    }

    /// Keyboard shortcut handler.
    pub async fn on_command(&self, command: &str) {
        if command != TOGGLE_DESIGN_COMMAND {
            return;
        }

        let tab = match self.tabs.active_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };
        if let Err(e) = self.toggle_and_reload(tab).await {
            log::error!("Error toggling design via shortcut: {}", e);
        }
    }

    async fn toggle_and_reload(&self, tab: Option<TabInfo>) -> Result<(), String> {
        let enabled = self.flip_design().await.map_err(|e| e.to_string())?;
        log::info!("Netflix design {}", if enabled { "enabled" } else { "disabled" });

        match tab {
            Some(tab) if tab.is_on_site(SITE_DOMAIN) => self.tabs.reload_tab(tab.id).await,
            _ => Ok(()),
        }
    }

    /// Bump the activation counter; runs each time the worker starts.
    pub async fn record_activation(&self, now: f64) {
        let stats = match self.store.get(StorageArea::Sync, &[STATS_KEY]).await {
            Ok(mut values) => values
                .remove(STATS_KEY)
                .and_then(|value| serde_json::from_value::<UsageStats>(value).ok()),
            Err(e) => {
                log::error!("Error updating stats: {}", e);
                return;
            }
        };

        let mut stats = stats.unwrap_or_else(|| UsageStats::new(now));
        stats.record(now);

        let value = match serde_json::to_value(&stats) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Error updating stats: {}", e);
                return;
            }
        };
        let mut items = Map::new();
        items.insert(STATS_KEY.to_string(), value);
        if let Err(e) = self.store.set(StorageArea::Sync, items).await {
            log::error!("Error updating stats: {}", e);
        }
    }
}
