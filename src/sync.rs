/// Cross-context sync: keeps every rendered surface in step with the stored favorites
///
/// Two channels feed the bridge:
/// 1. the repository's local notifier, so the page that made a change updates
///    without waiting for the storage round trip
/// 2. the store's change notification, which reaches every context (this one included)
///
/// Signals carry no list. On each batch the bridge re-reads the repository and
/// hands the fresh list to every surface, so a missed or reordered event can
/// only delay convergence, never leave a surface stale.
use crate::config::FAVORITES_KEY;
use crate::favorites::FavoritesList;
use crate::repository::FavoritesRepository;
use crate::store::{KeyValueStore, StorageArea, StorageChange};
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use uuid::Uuid;

/// Same-context change notification fired by the repository.
#[derive(Clone, Default)]
pub struct LocalNotifier {
    listeners: Rc<RefCell<Vec<Rc<dyn Fn()>>>>,
}

impl LocalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Rc<dyn Fn()>) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn notify(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self.listeners.borrow().clone();
        for listener in listeners {
            listener();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncSignal {
    Local,
    Storage { area: StorageArea },
}

/// Anything that displays favorite state: a button, the popup counter, the list modal.
pub trait Surface {
    fn render(&self, favorites: &FavoritesList);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceId(u64);

pub struct SyncBridge {
    repo: Rc<FavoritesRepository>,
    surfaces: RefCell<Vec<(SurfaceId, Rc<dyn Surface>)>>,
    next_id: Cell<u64>,
    sender: UnboundedSender<SyncSignal>,
    receiver: RefCell<Option<UnboundedReceiver<SyncSignal>>>,
    context_id: Uuid,
}

impl SyncBridge {
    /// Create a bridge and subscribe it to both change channels.
    pub fn connect(repo: Rc<FavoritesRepository>) -> Rc<SyncBridge> {
        let (sender, receiver) = mpsc::unbounded();
        let bridge = Rc::new(SyncBridge {
            repo,
            surfaces: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            sender,
            receiver: RefCell::new(Some(receiver)),
            context_id: Uuid::new_v4(),
        });

        {
            let sender = bridge.sender.clone();
            bridge.repo.notifier().subscribe(Rc::new(move || {
                let _ = sender.unbounded_send(SyncSignal::Local);
            }));
        }

        {
            let sender = bridge.sender.clone();
            bridge.repo.store().on_changed(Rc::new(move |change: &StorageChange| {
                if change.area == StorageArea::Sync && change.key == FAVORITES_KEY {
                    let _ = sender.unbounded_send(SyncSignal::Storage { area: change.area });
                }
            }));
        }

        log::debug!("Sync bridge {} connected", bridge.context_id);
        bridge
    }

    pub fn repository(&self) -> &Rc<FavoritesRepository> {
        &self.repo
    }

    pub fn register(&self, surface: Rc<dyn Surface>) -> SurfaceId {
        let id = SurfaceId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.surfaces.borrow_mut().push((id, surface));
        id
    }

    pub fn unregister(&self, id: SurfaceId) {
        self.surfaces.borrow_mut().retain(|(surface_id, _)| *surface_id != id);
    }

    /// Re-read the repository and re-render every surface.
    pub async fn refresh(&self) -> FavoritesList {
        let favorites = self.repo.get_all().await;
        let surfaces: Vec<Rc<dyn Surface>> = self
            .surfaces
            .borrow()
            .iter()
            .map(|(_, surface)| surface.clone())
            .collect();

        for surface in surfaces {
            surface.render(&favorites);
        }
        favorites
    }

    /// Handle whatever signals are queued right now with a single refresh.
    /// Returns how many signals were consumed.
    pub async fn pump(&self) -> usize {
        let pending = {
            let mut receiver = self.receiver.borrow_mut();
            match receiver.as_mut() {
                Some(receiver) => drain(receiver),
                None => 0,
            }
        };

        if pending > 0 {
            self.refresh().await;
        }
        pending
    }

    /// Process signals until every sender is gone. Spawn once per context.
    pub async fn run(self: Rc<Self>) {
        let Some(mut receiver) = self.receiver.borrow_mut().take() else {
            log::warn!("Sync bridge {} is already running", self.context_id);
            return;
        };

        while let Some(signal) = receiver.next().await {
            let coalesced = drain(&mut receiver);
            log::debug!(
                "Sync bridge {} refreshing after {:?} (+{} queued)",
                self.context_id,
                signal,
                coalesced
            );
            self.refresh().await;
        }
    }
}

fn drain(receiver: &mut UnboundedReceiver<SyncSignal>) -> usize {
    let mut count = 0;
    while let Ok(Some(_)) = receiver.try_next() {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::{FavoriteItem, IdentityKey};
    use crate::store::memory::MemoryStore;
    use futures::executor::block_on;
    use serde_json::{Map, json};

    /// Records the "in list" state of one item, like a My List button.
    struct ButtonProbe {
        key: IdentityKey,
        in_list: Cell<Option<bool>>,
        renders: Cell<usize>,
    }

    impl ButtonProbe {
        fn new(url: &str, title: &str) -> Rc<Self> {
            Rc::new(ButtonProbe {
                key: IdentityKey::new(url, title),
                in_list: Cell::new(None),
                renders: Cell::new(0),
            })
        }
    }

    impl Surface for ButtonProbe {
        fn render(&self, favorites: &FavoritesList) {
            self.in_list.set(Some(favorites.contains(&self.key)));
            self.renders.set(self.renders.get() + 1);
        }
    }

    fn create_test_item(url: &str, title: &str) -> FavoriteItem {
        FavoriteItem::new(url.to_string(), title.to_string(), String::new(), String::new())
    }

    #[test]
    fn test_local_change_reaches_surface() {
        let store = Rc::new(MemoryStore::new());
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store)));
        let button = ButtonProbe::new("https://site/x/", "X");
        bridge.register(button.clone());

        block_on(bridge.repository().add(create_test_item("https://site/x/", "X"))).unwrap();
        // One local signal plus one storage signal, handled as one refresh.
        assert_eq!(block_on(bridge.pump()), 2);

        assert_eq!(button.in_list.get(), Some(true));
        assert_eq!(button.renders.get(), 1);
    }

    #[test]
    fn test_other_context_change_reaches_surface() {
        let store = Rc::new(MemoryStore::new());
        let tab_a = SyncBridge::connect(Rc::new(FavoritesRepository::new(store.clone())));
        let tab_b = SyncBridge::connect(Rc::new(FavoritesRepository::new(store.clone())));
        let button_b = ButtonProbe::new("https://site/x/", "X");
        tab_b.register(button_b.clone());

        let item = create_test_item("https://site/x/", "X");
        block_on(tab_a.repository().toggle(&item.identity(), item.clone())).unwrap();

        assert_eq!(block_on(tab_b.pump()), 1);
        assert_eq!(button_b.in_list.get(), Some(true));

        block_on(tab_a.repository().toggle(&item.identity(), item)).unwrap();
        block_on(tab_b.pump());
        assert_eq!(button_b.in_list.get(), Some(false));
    }

    #[test]
    fn test_surface_rederives_from_store_not_payload() {
        let store = Rc::new(MemoryStore::new());
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store.clone())));
        let button = ButtonProbe::new("https://site/x/", "X");
        bridge.register(button.clone());

        // A raw write by another context, bypassing the repository.
        let mut items = Map::new();
        items.insert(
            FAVORITES_KEY.to_string(),
            json!([{ "seriesUrl": "https://site/x/", "title": "X" }]),
        );
        block_on(store.set(StorageArea::Sync, items)).unwrap();

        block_on(bridge.pump());
        assert_eq!(button.in_list.get(), Some(true));
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let store = Rc::new(MemoryStore::new());
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store.clone())));

        let mut items = Map::new();
        items.insert("designEnabled".to_string(), json!(false));
        block_on(store.set(StorageArea::Sync, items.clone())).unwrap();
        block_on(store.set(StorageArea::Local, {
            let mut local = Map::new();
            local.insert(FAVORITES_KEY.to_string(), json!([]));
            local
        }))
        .unwrap();

        assert_eq!(block_on(bridge.pump()), 0);
    }

    #[test]
    fn test_unregister_stops_updates() {
        let store = Rc::new(MemoryStore::new());
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store)));
        let button = ButtonProbe::new("https://site/x/", "X");
        let id = bridge.register(button.clone());

        bridge.unregister(id);
        block_on(bridge.repository().add(create_test_item("https://site/x/", "X"))).unwrap();
        block_on(bridge.pump());

        assert_eq!(button.renders.get(), 0);
    }

    #[test]
    fn test_clear_resets_surfaces() {
        let store = Rc::new(MemoryStore::new());
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store)));
        let button = ButtonProbe::new("https://site/x/", "X");
        bridge.register(button.clone());
        block_on(bridge.repository().add(create_test_item("https://site/x/", "X"))).unwrap();
        block_on(bridge.pump());

        block_on(bridge.repository().clear()).unwrap();
        block_on(bridge.pump());

        assert_eq!(button.in_list.get(), Some(false));
    }

    #[test]
    fn test_run_exits_after_receiver_taken() {
        let store = Rc::new(MemoryStore::new());
        let bridge = SyncBridge::connect(Rc::new(FavoritesRepository::new(store)));
        bridge.receiver.borrow_mut().take();

        block_on(bridge.clone().run());
        assert_eq!(block_on(bridge.pump()), 0);
    }
}
