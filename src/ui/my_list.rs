/// "My List" modal, mounted into the site page on demand

use crate::browser;
use crate::favorites::FavoritesList;
use crate::sync::{Surface, SyncBridge};
use crate::ui::components::{PosterCard, Toast, ToastMessage};
use patternfly_yew::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::AppHandle;
use yew::prelude::*;

const ROOT_ID: &str = "mjeed-my-list-root";

thread_local! {
    static MOUNTED: RefCell<Option<AppHandle<MyListModal>>> = const { RefCell::new(None) };
}

/// Shared bridge handle usable as a Yew prop.
#[derive(Clone)]
pub struct BridgeHandle(pub Rc<SyncBridge>);

impl PartialEq for BridgeHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

struct ListSurface {
    favorites: UseStateHandle<FavoritesList>,
}

impl Surface for ListSurface {
    fn render(&self, favorites: &FavoritesList) {
        self.favorites.set(favorites.clone());
    }
}

#[derive(Properties, PartialEq)]
pub struct MyListProps {
    pub bridge: BridgeHandle,
}

#[function_component(MyListModal)]
pub fn my_list_modal(props: &MyListProps) -> Html {
    let favorites = use_state(FavoritesList::new);
    let open = use_state(|| true);
    let toast = use_state(|| None::<ToastMessage>);

    // Live updates for as long as the modal is mounted
    {
        let favorites = favorites.clone();
        use_effect_with(props.bridge.clone(), move |bridge| {
            let bridge = bridge.0.clone();
            let id = bridge.register(Rc::new(ListSurface { favorites }));
            {
                let bridge = bridge.clone();
                spawn_local(async move {
                    bridge.refresh().await;
                });
            }
            move || bridge.unregister(id)
        });
    }

    let on_remove = {
        let bridge = props.bridge.clone();
        let toast = toast.clone();

        Callback::from(move |series_url: String| {
            let repo = bridge.0.repository().clone();
            let toast = toast.clone();

            spawn_local(async move {
                if let Err(e) = repo.remove(&series_url).await {
                    log::error!("Failed to remove {}: {}", series_url, e);
                    toast.set(Some(ToastMessage::error("حدث خطأ أثناء الحذف")));
                }
            });
        })
    };

    let on_close = {
        let open = open.clone();
        Callback::from(move |_: MouseEvent| open.set(false))
    };

    if !*open {
        return html! {};
    }

    let items = favorites.newest_first();

    html! {
        <div class="mjeed-modal-backdrop">
            <div class="mjeed-modal" dir="rtl">
                <div class="mjeed-modal-header">
                    <h2 class="mjeed-modal-title">{format!("قائمتي ({})", favorites.len())}</h2>
                    <Button onclick={on_close} variant={ButtonVariant::Plain}>
                        {"✕"}
                    </Button>
                </div>

                if let Some(message) = (*toast).clone() {
                    <Toast message={message} />
                }

                if items.is_empty() {
                    <p class="mjeed-modal-empty">{"القائمة فارغة!"}</p>
                } else {
                    <div class="mjeed-grid">
                        {for items.into_iter().map(|item| {
                            let key = item.series_url.clone();
                            html! {
                                <PosterCard key={key} item={item} on_remove={on_remove.clone()} />
                            }
                        })}
                    </div>
                }
            </div>
        </div>
    }
}

/// Mount (or re-mount) the modal on the current page.
pub fn show(bridge: Rc<SyncBridge>) -> Result<(), JsValue> {
    let document = browser::document()?;
    let root = match document.get_element_by_id(ROOT_ID) {
        Some(root) => root,
        None => {
            let root = document.create_element("div")?;
            root.set_id(ROOT_ID);
            document
                .body()
                .ok_or_else(|| JsValue::from_str("page has no body"))?
                .append_child(&root)?;
            root
        }
    };

    MOUNTED.with(|mounted| {
        if let Some(previous) = mounted.borrow_mut().take() {
            previous.destroy();
        }
        let props = MyListProps {
            bridge: BridgeHandle(bridge),
        };
        let handle = yew::Renderer::<MyListModal>::with_root_and_props(root, props).render();
        *mounted.borrow_mut() = Some(handle);
    });

    log::debug!("My List opened");
    Ok(())
}
