use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Instant,
    Smooth,
}

/// Live geometry exposed by the rendering layer.
pub trait LayoutHost: Send + Sync {
    fn scroll_y(&self) -> f64;
    /// Document-relative top of the container registered under `key`.
    fn element_top(&self, key: &str) -> Option<f64>;
    fn scroll_to(&self, y: f64, behavior: ScrollBehavior);
}

/// Hands the tab back to the site's own page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

#[derive(Debug, Default)]
struct LayoutState {
    scroll_y: f64,
    tops: HashMap<String, f64>,
    last_behavior: Option<ScrollBehavior>,
}

/// Container offsets keyed by `chapter-<id>`, kept current by whoever renders.
#[derive(Debug, Default)]
pub struct RenderedLayout {
    state: Mutex<LayoutState>,
}

impl RenderedLayout {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LayoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.state().scroll_y = y;
    }

    /// Replaces every registered container after a render pass.
    pub fn replace_tops(&self, tops: impl IntoIterator<Item = (String, f64)>) {
        let mut state = self.state();
        state.tops.clear();
        state.tops.extend(tops);
    }

    pub fn set_element_top(&self, key: impl Into<String>, top: f64) {
        self.state().tops.insert(key.into(), top);
    }

    pub fn remove_element(&self, key: &str) {
        self.state().tops.remove(key);
    }

    pub fn last_scroll_behavior(&self) -> Option<ScrollBehavior> {
        self.state().last_behavior
    }
}

impl LayoutHost for RenderedLayout {
    fn scroll_y(&self) -> f64 {
        self.state().scroll_y
    }

    fn element_top(&self, key: &str) -> Option<f64> {
        self.state().tops.get(key).copied()
    }

    fn scroll_to(&self, y: f64, behavior: ScrollBehavior) {
        let mut state = self.state();
        state.scroll_y = y;
        state.last_behavior = Some(behavior);
    }
}

#[derive(Debug, Default)]
pub struct NavigationLog {
    requested: Mutex<Vec<Url>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Vec<Url> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, url: &Url) {
        tracing::info!(url = %url, "handing navigation back to the site");
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
    }
}
