/// Popup UI for the Mjeed extension

use crate::browser;
use crate::config::VERSION;
use crate::favorites::FavoritesList;
use crate::messages::ContentCommand;
use crate::repository::FavoritesRepository;
use crate::store::ChromeStore;
use crate::sync::{Surface, SyncBridge};
use crate::tabs::{ChromeTabs, TabHost};
use crate::ui::components::{Toast, ToastMessage};
use patternfly_yew::prelude::*;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    fn exportToFile(data: &str, filename: &str);

    fn closePopup();
}

const CLOSE_AFTER_CLEAR: Duration = Duration::from_millis(1500);

#[derive(Clone, PartialEq)]
enum PopupState {
    Idle,
    Busy(String),
}

struct CountSurface {
    count: UseStateHandle<usize>,
}

impl Surface for CountSurface {
    fn render(&self, favorites: &FavoritesList) {
        self.count.set(favorites.len());
    }
}

/// `qeseh_favorites_YYYY-MM-DD.json` from an ISO timestamp.
pub fn export_filename(now_iso: &str) -> String {
    let date = now_iso.get(..10).unwrap_or(now_iso);
    format!("qeseh_favorites_{}.json", date)
}

#[function_component(App)]
pub fn app() -> Html {
    let count = use_state(|| 0usize);
    let state = use_state(|| PopupState::Idle);
    let toast = use_state(|| None::<ToastMessage>);
    let bridge = use_memo((), |_| {
        SyncBridge::connect(Rc::new(FavoritesRepository::new(Rc::new(ChromeStore::new()))))
    });

    // Keep the counter live while the popup is open
    {
        let count = count.clone();
        let bridge = (*bridge).clone();
        use_effect_with((), move |_| {
            bridge.register(Rc::new(CountSurface { count }));
            spawn_local(bridge.clone().run());
            spawn_local(async move {
                bridge.refresh().await;
            });
            || ()
        });
    }

    let on_view_list = {
        let toast = toast.clone();

        Callback::from(move |_| {
            let toast = toast.clone();

            spawn_local(async move {
                match show_list_in_active_tab().await {
                    Ok(()) => closePopup(),
                    Err(e) => {
                        log::error!("Error opening My List: {}", e);
                        toast.set(Some(ToastMessage::error("حدث خطأ أثناء فتح القائمة")));
                    }
                }
            });
        })
    };

    let on_export = {
        let bridge = (*bridge).clone();
        let toast = toast.clone();

        Callback::from(move |_| {
            let repo = bridge.repository().clone();
            let toast = toast.clone();

            spawn_local(async move {
                let favorites = repo.get_all().await;
                if favorites.is_empty() {
                    toast.set(Some(ToastMessage::error("القائمة فارغة!")));
                    return;
                }

                match serde_json::to_string_pretty(&favorites) {
                    Ok(data) => {
                        exportToFile(&data, &export_filename(&browser::now_iso()));
                        toast.set(Some(ToastMessage::success("تم تصدير القائمة بنجاح")));
                    }
                    Err(e) => {
                        log::error!("Export failed: {}", e);
                        toast.set(Some(ToastMessage::error("حدث خطأ أثناء التصدير")));
                    }
                }
            });
        })
    };

    let on_clear = {
        let bridge = (*bridge).clone();
        let state = state.clone();
        let toast = toast.clone();

        Callback::from(move |_| {
            let repo = bridge.repository().clone();
            let state = state.clone();
            let toast = toast.clone();

            state.set(PopupState::Busy("جاري المسح...".to_string()));

            spawn_local(async move {
                if let Err(e) = repo.clear().await {
                    log::error!("Failed to clear cache: {}", e);
                    state.set(PopupState::Idle);
                    toast.set(Some(ToastMessage::error("حدث خطأ أثناء مسح الذاكرة")));
                    return;
                }

                toast.set(Some(ToastMessage::success("تم مسح الذاكرة المؤقتة بنجاح!")));
                if let Err(e) = reload_active_tab().await {
                    log::warn!("Could not reload the active tab: {}", e);
                }
                browser::sleep(CLOSE_AFTER_CLEAR).await;
                closePopup();
            });
        })
    };

    let is_busy = !matches!(*state, PopupState::Idle);

    html! {
        <div class="padding-20" dir="rtl">
            <h1 class="popup-title">{"مجيد"}</h1>

            <div class="stats-box">
                <span class="stat-label">{"عدد العناصر في قائمتي"}</span>
                <span class="stat-count">{*count}</span>
            </div>

            if let PopupState::Busy(msg) = &*state {
                <div class="loading-text-center">
                    <Spinner />
                    <p class="loading-text">{msg}</p>
                </div>
            }

            if let Some(message) = (*toast).clone() {
                <Toast message={message} />
            }

            <div class="flex-column-gap">
                <Button onclick={on_view_list} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                    {"عرض قائمتي"}
                </Button>
                <Button onclick={on_export} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"تصدير القائمة"}
                </Button>
                <Button onclick={on_clear} disabled={is_busy} variant={ButtonVariant::Danger} block={true}>
                    {"مسح الذاكرة المؤقتة"}
                </Button>
            </div>

            <p class="footer-popup">
                {format!("Mjeed v{}", VERSION)}
            </p>
        </div>
    }
}

// Helper functions

async fn show_list_in_active_tab() -> Result<(), String> {
    let tabs = ChromeTabs;
    let tab = tabs.active_tab().await?.ok_or_else(|| "No active tab".to_string())?;
    tabs.send_message(tab.id, ContentCommand::ShowMyList.to_value()).await?;
    Ok(())
}

async fn reload_active_tab() -> Result<(), String> {
    let tabs = ChromeTabs;
    match tabs.active_tab().await? {
        Some(tab) => tabs.reload_tab(tab.id).await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("2024-03-05T10:20:30.000Z"),
            "qeseh_favorites_2024-03-05.json"
        );
    }

    #[test]
    fn test_export_filename_short_input() {
        assert_eq!(export_filename("2024"), "qeseh_favorites_2024.json");
    }
}
