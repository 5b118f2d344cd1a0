/// Data structures for the "My List" favorites
use serde::{Deserialize, Serialize};

/// A saved series or movie.
///
/// Field names are the persisted wire format and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItem {
    pub series_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_image: String,
    #[serde(default)]
    pub added_at: String,
    /// `"movie"` for movies; absent for series. Kept as a raw string so an
    /// unknown value from a newer version does not make the whole list unreadable.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Series,
    Movie,
}

impl FavoriteItem {
    pub fn new(series_url: String, title: String, poster_image: String, added_at: String) -> Self {
        FavoriteItem {
            series_url,
            title,
            poster_image,
            added_at,
            kind: None,
        }
    }

    pub fn movie(series_url: String, title: String, poster_image: String, added_at: String) -> Self {
        FavoriteItem {
            kind: Some("movie".to_string()),
            ..FavoriteItem::new(series_url, title, poster_image, added_at)
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self.kind.as_deref() {
            Some("movie") => ItemKind::Movie,
            _ => ItemKind::Series,
        }
    }

    pub fn identity(&self) -> IdentityKey {
        IdentityKey::new(&self.series_url, &self.title)
    }
}

/// Match key for a favorite: either the URL or the trimmed title identifies an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub series_url: String,
    pub title: String,
}

impl IdentityKey {
    pub fn new(series_url: &str, title: &str) -> Self {
        IdentityKey {
            series_url: series_url.to_string(),
            title: title.to_string(),
        }
    }

    /// Loose match: same URL OR same trimmed title. Case-sensitive.
    pub fn matches(&self, item: &FavoriteItem) -> bool {
        item.series_url == self.series_url || item.title.trim() == self.title.trim()
    }
}

/// Ordered favorites, oldest first. Serialized as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoritesList {
    items: Vec<FavoriteItem>,
}

impl FavoritesList {
    pub fn new() -> Self {
        FavoritesList { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[FavoriteItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &FavoriteItem> {
        self.items.iter()
    }

    /// Most recently added first, as the list modal shows them.
    pub fn newest_first(&self) -> Vec<FavoriteItem> {
        self.items.iter().rev().cloned().collect()
    }

    pub fn position(&self, key: &IdentityKey) -> Option<usize> {
        self.items.iter().position(|item| key.matches(item))
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.position(key).is_some()
    }

    /// Append unless an entry already matches by URL or title.
    pub fn push_unique(&mut self, item: FavoriteItem) -> bool {
        if self.contains(&item.identity()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove every entry with exactly this URL.
    pub fn remove_url(&mut self, series_url: &str) -> bool {
        let len_before = self.items.len();
        self.items.retain(|item| item.series_url != series_url);
        self.items.len() < len_before
    }

    /// Remove the first entry matching `key`, or append `item`. Returns true when added.
    pub fn toggle(&mut self, key: &IdentityKey, item: FavoriteItem) -> bool {
        match self.position(key) {
            Some(index) => {
                self.items.remove(index);
                false
            }
            None => {
                self.items.push(item);
                true
            }
        }
    }
}

impl From<Vec<FavoriteItem>> for FavoritesList {
    fn from(items: Vec<FavoriteItem>) -> Self {
        FavoritesList { items }
    }
}
