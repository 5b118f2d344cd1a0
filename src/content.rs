/// Content script: page classification, favorite button sync, message handling
use crate::browser::{self, DocumentProbe};
use crate::config::{BROWSING_CLASS, IN_LIST_CLASS, SERIES_INFO_SELECTOR, Settings};
use crate::error::StoreError;
use crate::favorites::{FavoriteItem, FavoritesList, IdentityKey};
use crate::messages::{ContentCommand, Response};
use crate::normalize::{normalize_series_title, normalize_series_url};
use crate::page::{self, NavigationWatcher, PageProbe, PageRole, PageState, RetrySchedule, Transition};
use crate::repository::{FavoritesRepository, Toggled};
use crate::store::{ChromeStore, KeyValueStore};
use crate::sync::{Surface, SyncBridge};
use crate::ui::my_list;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Document, Element, Event, MutationObserver, MutationObserverInit};

#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    fn onRuntimeMessage(handler: &Closure<dyn FnMut(JsValue) -> js_sys::Promise>);
}

const ROLES: [PageRole; 4] = [PageRole::Watch, PageRole::Movie, PageRole::Series, PageRole::Listing];

/// Every "My List" toggle on the page, injected or not.
const LIST_BUTTON_SELECTOR: &str = "button[data-series-url]";
const LIST_BUTTON_ID: &str = "mjeed-my-list-button";
const LIST_BUTTON_PARENTS: [&str; 2] = [".singleInfo", SERIES_INFO_SELECTOR];

fn role_class(role: PageRole) -> String {
    format!("mjeed-page-{}", role.as_str())
}

/// Re-derives the "in my list" state of every list button.
struct ButtonSurface {
    document: Document,
}

impl Surface for ButtonSurface {
    fn render(&self, favorites: &FavoritesList) {
        let Ok(buttons) = self.document.query_selector_all(LIST_BUTTON_SELECTOR) else {
            return;
        };

        for index in 0..buttons.length() {
            let Some(button) = buttons.get(index).and_then(|node| node.dyn_into::<Element>().ok()) else {
                continue;
            };
            let key = IdentityKey::new(
                &button.get_attribute("data-series-url").unwrap_or_default(),
                &button.get_attribute("data-series-title").unwrap_or_default(),
            );
            let in_list = favorites.contains(&key);

            let _ = button.class_list().toggle_with_force(IN_LIST_CLASS, in_list);
            let _ = button.set_attribute("aria-pressed", if in_list { "true" } else { "false" });
            button.set_text_content(Some(if in_list { "✓ قائمتي" } else { "+ قائمتي" }));
        }
    }
}

pub struct ContentScript {
    document: Document,
    bridge: Rc<SyncBridge>,
    state: RefCell<PageState>,
    watcher: RefCell<NavigationWatcher>,
    schedule: RetrySchedule,
    /// Bumped on every navigation so a slower, older reconcile cannot win.
    generation: Cell<u64>,
}

impl ContentScript {
    pub fn start() -> Result<Rc<ContentScript>, JsValue> {
        let script = Self::attach(browser::document()?, Rc::new(ChromeStore::new()));

        spawn_local(script.bridge.clone().run());
        script.apply_settings();
        script.observe_navigation()?;
        script.listen_for_clicks()?;
        script.listen_for_messages();
        script.schedule_reconcile();

        log::info!(
            "Mjeed content script started on {}",
            DocumentProbe::new(script.document.clone()).url()
        );
        Ok(script)
    }

    /// Wire the repository and sync bridge to `document` without installing any listeners.
    fn attach(document: Document, store: Rc<dyn KeyValueStore>) -> Rc<ContentScript> {
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store)));
        bridge.register(Rc::new(ButtonSurface {
            document: document.clone(),
        }));

        let url = DocumentProbe::new(document.clone()).url();
        Rc::new(ContentScript {
            document,
            bridge,
            state: RefCell::new(PageState::default()),
            watcher: RefCell::new(NavigationWatcher::new(&url)),
            schedule: RetrySchedule::default(),
            generation: Cell::new(0),
        })
    }

    fn apply_settings(self: &Rc<Self>) {
        let script = self.clone();
        spawn_local(async move {
            let store = script.bridge.repository().store().clone();
            let settings = Settings::load(store.as_ref()).await;
            log::set_max_level(settings.log_level().to_level_filter());
            script.set_design(settings.design_enabled);
        });
    }

    fn set_design(&self, enabled: bool) {
        if let Some(body) = self.document.body() {
            let _ = body.class_list().toggle_with_force(BROWSING_CLASS, enabled);
        }
    }

    /// The site is a single-page app: watch the DOM for URL changes.
    fn observe_navigation(self: &Rc<Self>) -> Result<(), JsValue> {
        let script = self.clone();
        let callback = Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
            let url = DocumentProbe::new(script.document.clone()).url();
            if script.watcher.borrow_mut().observe(&url) {
                script.schedule_reconcile();
            }
        }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        observer.observe_with_options(&self.document, &options)?;

        callback.forget();
        Ok(())
    }

    /// One delegated listener covers buttons rendered after start-up too.
    fn listen_for_clicks(self: &Rc<Self>) -> Result<(), JsValue> {
        let script = self.clone();
        let callback = Closure::wrap(Box::new(move |event: Event| {
            let Some(button) = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .and_then(|element| element.closest(LIST_BUTTON_SELECTOR).ok().flatten())
            else {
                return;
            };
            event.prevent_default();

            let script = script.clone();
            spawn_local(async move {
                if let Err(e) = script.toggle_button(&button).await {
                    log::error!("Error toggling favorite: {}", e);
                }
            });
        }) as Box<dyn FnMut(Event)>);

        self.document
            .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())?;
        callback.forget();
        Ok(())
    }

    /// Toggle the favorite described by a list button's data attributes.
    pub async fn toggle_button(&self, button: &Element) -> Result<Toggled, StoreError> {
        let attribute = |name: &str| button.get_attribute(name).unwrap_or_default();
        let series_url = attribute("data-series-url");
        let title = attribute("data-series-title");
        let key = IdentityKey::new(&series_url, &title);

        let item = if attribute("data-kind") == "movie" {
            FavoriteItem::movie(series_url, title, attribute("data-poster-image"), browser::now_iso())
        } else {
            FavoriteItem::new(series_url, title, attribute("data-poster-image"), browser::now_iso())
        };

        self.bridge.repository().toggle(&key, item).await
    }

    fn schedule_reconcile(self: &Rc<Self>) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let script = self.clone();
        spawn_local(async move {
            let probe = DocumentProbe::new(script.document.clone());
            let role = page::reconcile(&probe, &script.schedule, browser::sleep).await;
            if script.generation.get() == generation {
                script.apply_role(role);
            }
        });
    }

    fn apply_role(&self, role: Option<PageRole>) {
        let transition = self.state.borrow_mut().apply(role);
        let Some(body) = self.document.body() else {
            return;
        };

        match transition {
            Transition::Unchanged => {}
            Transition::Entered(role) => {
                for other in ROLES {
                    let _ = body.class_list().remove_1(&role_class(other));
                }
                let _ = body.class_list().add_1(&role_class(role));
                self.sync_list_button(Some(role));
                log::info!("Page classified as {}", role.as_str());

                let bridge = self.bridge.clone();
                spawn_local(async move {
                    bridge.refresh().await;
                });
            }
            Transition::Left(role) => {
                let _ = body.class_list().remove_1(&role_class(role));
                self.sync_list_button(None);
                log::debug!("Page no longer {}", role.as_str());
            }
        }
    }

    /// Keep exactly one injected list button on series and movie pages, none elsewhere.
    fn sync_list_button(&self, role: Option<PageRole>) {
        let existing = self.document.get_element_by_id(LIST_BUTTON_ID);

        if !matches!(role, Some(PageRole::Series | PageRole::Movie)) {
            if let Some(button) = existing {
                button.remove();
            }
            return;
        }

        let button = match existing {
            Some(button) => button,
            None => match self.create_list_button() {
                Ok(button) => button,
                Err(e) => {
                    log::warn!("Could not add My List button: {:?}", e);
                    return;
                }
            },
        };

        let item = self.current_item();
        let _ = button.set_attribute("data-series-url", &item.series_url);
        let _ = button.set_attribute("data-series-title", &item.title);
        let _ = button.set_attribute("data-poster-image", &item.poster_image);
        match item.kind.as_deref() {
            Some(kind) => {
                let _ = button.set_attribute("data-kind", kind);
            }
            None => {
                let _ = button.remove_attribute("data-kind");
            }
        }
    }

    fn create_list_button(&self) -> Result<Element, JsValue> {
        let button = self.document.create_element("button")?;
        button.set_id(LIST_BUTTON_ID);
        button.set_class_name("mjeed-mylist-btn");
        button.set_text_content(Some("+ قائمتي"));

        let parent = LIST_BUTTON_PARENTS
            .iter()
            .find_map(|selector| self.document.query_selector(selector).ok().flatten())
            .or_else(|| self.document.body().map(Element::from))
            .ok_or_else(|| JsValue::from_str("page has no body"))?;
        parent.append_child(&button)?;
        Ok(button)
    }

    fn listen_for_messages(self: &Rc<Self>) {
        let script = self.clone();
        let handler = Closure::wrap(Box::new(move |request: JsValue| -> js_sys::Promise {
            let script = script.clone();
            future_to_promise(async move {
                let request: Value = serde_wasm_bindgen::from_value(request).unwrap_or(Value::Null);
                let reply = script.handle_message(request).await;
                reply
                    .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                    .map_err(|e| JsValue::from_str(&e.to_string()))
            })
        }) as Box<dyn FnMut(JsValue) -> js_sys::Promise>);

        onRuntimeMessage(&handler);
        handler.forget();
    }

    pub async fn handle_message(&self, request: Value) -> Value {
        let command = match ContentCommand::parse(request) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Rejected message: {}", e);
                return Response::error(&e).to_value();
            }
        };

        let response = match command {
            ContentCommand::ShowMyList | ContentCommand::OpenFavorites => {
                match my_list::show(self.bridge.clone()) {
                    Ok(()) => Response::Shown { shown: true },
                    Err(e) => Response::Error {
                        error: format!("{:?}", e),
                    },
                }
            }
            ContentCommand::AddCurrentToFavorites => {
                let item = self.current_item();
                match self.bridge.repository().add(item).await {
                    Ok(true) => Response::Saved { success: true, error: None },
                    Ok(false) => Response::Saved {
                        success: false,
                        error: Some("already in My List".to_string()),
                    },
                    Err(e) => Response::saved(Err(e)),
                }
            }
            ContentCommand::RefreshDesign { enabled } => {
                self.set_design(enabled);
                Response::Received { received: true }
            }
        };
        response.to_value()
    }

    /// Build a favorite for the page being viewed.
    fn current_item(&self) -> FavoriteItem {
        let probe = DocumentProbe::new(self.document.clone());
        let series_url = normalize_series_url(&probe.url());

        let raw_title = page::TITLE_SELECTORS
            .iter()
            .find_map(|selector| probe.text_of(selector))
            .unwrap_or_else(|| probe.title());
        let title = normalize_series_title(&raw_title);

        let poster_image = probe
            .attribute_of(&format!("{} img", SERIES_INFO_SELECTOR), "src")
            .map(|src| format!("url(\"{}\")", src))
            .unwrap_or_default();

        match self.state.borrow().role() {
            Some(PageRole::Movie) => FavoriteItem::movie(series_url, title, poster_image, browser::now_iso()),
            _ => FavoriteItem::new(series_url, title, poster_image, browser::now_iso()),
        }
    }
}
