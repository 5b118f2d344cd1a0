/// Page role detection for the host site's single-page navigation
use crate::config::{
    ITEM_CARD_SELECTOR, MOVIE_PATH, SERIES_HEADING_SELECTOR, SERIES_INFO_SELECTOR, SERIES_PATH,
    SINGLE_POST_CLASS, WATCH_PATH,
};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRole {
    Watch,
    Movie,
    Series,
    Listing,
}

impl PageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageRole::Watch => "watch",
            PageRole::Movie => "movie",
            PageRole::Series => "series",
            PageRole::Listing => "listing",
        }
    }

    /// Elements that show the page content for this role has rendered.
    fn ready_markers(&self) -> &'static [&'static str] {
        match self {
            PageRole::Watch => &[".getEmbed", ".modern-player-container"],
            PageRole::Movie | PageRole::Series => &[SERIES_INFO_SELECTOR, ".singleInfo", "h1"],
            PageRole::Listing => &[ITEM_CARD_SELECTOR],
        }
    }

    pub fn is_ready(&self, probe: &impl PageProbe) -> bool {
        self.ready_markers().iter().any(|selector| probe.has_element(selector))
    }
}

/// Read-only view of the current page.
pub trait PageProbe {
    fn url(&self) -> String;
    fn has_element(&self, selector: &str) -> bool;
    fn body_has_class(&self, class: &str) -> bool;
}

pub fn is_watch_page(url: &str) -> bool {
    url.contains(WATCH_PATH)
}

pub fn is_movie_page(url: &str) -> bool {
    url.contains(MOVIE_PATH)
}

pub fn is_series_page(url: &str, probe: &impl PageProbe) -> bool {
    url.contains(SERIES_PATH)
        || probe.has_element(SERIES_INFO_SELECTOR)
        || probe.body_has_class(SINGLE_POST_CLASS)
}

pub fn is_listing_page(probe: &impl PageProbe) -> bool {
    probe.has_element(ITEM_CARD_SELECTOR)
}

/// Classify the page. First match wins: watch > movie > series > listing.
pub fn classify(probe: &impl PageProbe) -> Option<PageRole> {
    let url = probe.url();

    if is_watch_page(&url) {
        Some(PageRole::Watch)
    } else if is_movie_page(&url) {
        Some(PageRole::Movie)
    } else if is_series_page(&url, probe) {
        Some(PageRole::Series)
    } else if is_listing_page(probe) {
        Some(PageRole::Listing)
    } else {
        None
    }
}

/// Heading to use as the item title on a series or movie page.
pub const TITLE_SELECTORS: [&str; 2] = [SERIES_HEADING_SELECTOR, "h1"];

/// Per-page classification state. Only tab close ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageState {
    #[default]
    Unclassified,
    Classified(PageRole),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Entered(PageRole),
    Left(PageRole),
}

impl PageState {
    /// Apply a classification outcome. Re-applying the same role reports `Unchanged`,
    /// which is what keeps overlay injection from running twice.
    pub fn apply(&mut self, outcome: Option<PageRole>) -> Transition {
        let next = match outcome {
            Some(role) => PageState::Classified(role),
            None => PageState::Unclassified,
        };

        let transition = match (*self, next) {
            (current, next) if current == next => Transition::Unchanged,
            (_, PageState::Classified(role)) => Transition::Entered(role),
            (PageState::Classified(role), PageState::Unclassified) => Transition::Left(role),
            (PageState::Unclassified, PageState::Unclassified) => Transition::Unchanged,
        };

        *self = next;
        transition
    }

    pub fn role(&self) -> Option<PageRole> {
        match self {
            PageState::Classified(role) => Some(*role),
            PageState::Unclassified => None,
        }
    }
}

/// Turns a stream of DOM mutations into navigation events by watching the URL.
#[derive(Debug, Clone)]
pub struct NavigationWatcher {
    last_url: String,
}

impl NavigationWatcher {
    pub fn new(url: &str) -> Self {
        NavigationWatcher {
            last_url: url.to_string(),
        }
    }

    /// True when `url` differs from the last one seen.
    pub fn observe(&mut self, url: &str) -> bool {
        if url == self.last_url {
            return false;
        }
        log::info!("URL changed to: {}", url);
        self.last_url = url.to_string();
        true
    }
}

/// Bounded retry schedule for classifying a page whose content renders late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    pub initial_delay: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        RetrySchedule {
            initial_delay: Duration::from_millis(500),
            max_attempts: 20,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Classify the page, retrying until the role's content markers appear.
///
/// Gives up after `schedule.max_attempts` and returns `None`, leaving the page
/// unclassified.
pub async fn reconcile<P, S, F>(probe: &P, schedule: &RetrySchedule, mut sleep: S) -> Option<PageRole>
where
    P: PageProbe,
    S: FnMut(Duration) -> F,
    F: Future<Output = ()>,
{
    if !schedule.initial_delay.is_zero() {
        sleep(schedule.initial_delay).await;
    }

    for attempt in 1..=schedule.max_attempts {
        if let Some(role) = classify(probe) {
            if role.is_ready(probe) {
                log::debug!("Classified page as {} on attempt {}", role.as_str(), attempt);
                return Some(role);
            }
        }

        if attempt < schedule.max_attempts {
            sleep(schedule.backoff).await;
        }
    }

    log::debug!("Page left unclassified after {} attempts", schedule.max_attempts);
    None
}
