//! The chapter window manager.
//!
//! A [`Reader`] is one reading session: the fixed table of contents, the
//! window of rendered chapters, the fetch cursor and the two flags the
//! rendering layer watches (`fetching`, `exhausted`). At most one fetch is
//! outstanding at any time; every failure is absorbed here.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::fetch::ChapterFetcher;
use crate::formats::{ChapterRecord, ScrollAnchor, WindowSnapshot, element_key};
use crate::layout::LayoutHost;
use crate::toc::TableOfContents;
use crate::window::ChapterWindow;

#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Another fetch is still outstanding.
    Busy,
    AlreadyExhausted,
    /// The cursor ran past the table of contents.
    EndOfContents,
    /// The fetcher reported no chapter; auto-load stops for the session.
    Missing { index: usize },
    /// Unexpected fetch error; the cursor stays put so a later scroll retries.
    Failed { index: usize },
    Appended { index: usize },
    Rotated { index: usize, evicted: ChapterRecord },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStatus {
    pub cursor: usize,
    pub fetching: bool,
    pub exhausted: bool,
    pub window_len: usize,
}

#[derive(Debug)]
struct ReaderState {
    cursor: usize,
    window: ChapterWindow,
    fetching: bool,
    exhausted: bool,
    anchor: Option<ScrollAnchor>,
}

pub struct Reader {
    toc: TableOfContents,
    fetcher: Arc<dyn ChapterFetcher>,
    layout: Arc<dyn LayoutHost>,
    state: Mutex<ReaderState>,
    changes: watch::Sender<WindowSnapshot>,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("toc_len", &self.toc.len())
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl Reader {
    /// `seed` is the already-rendered chapter at `start_index`.
    pub fn new(
        toc: TableOfContents,
        start_index: usize,
        seed: ChapterRecord,
        capacity: usize,
        fetcher: Arc<dyn ChapterFetcher>,
        layout: Arc<dyn LayoutHost>,
    ) -> anyhow::Result<Self> {
        if start_index >= toc.len() {
            anyhow::bail!(
                "start index {start_index} is outside the table of contents ({} chapters)",
                toc.len()
            );
        }

        let state = ReaderState {
            cursor: start_index + 1,
            window: ChapterWindow::new(seed, capacity),
            fetching: false,
            exhausted: false,
            anchor: None,
        };
        let (changes, _) = watch::channel(snapshot_of(&state));

        Ok(Self {
            toc,
            fetcher,
            layout,
            state: Mutex::new(state),
            changes,
        })
    }

    fn state(&self) -> MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self) {
        let snapshot = snapshot_of(&self.state());
        self.changes.send_replace(snapshot);
    }

    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    pub fn status(&self) -> ReaderStatus {
        let state = self.state();
        ReaderStatus {
            cursor: state.cursor,
            fetching: state.fetching,
            exhausted: state.exhausted,
            window_len: state.window.len(),
        }
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        snapshot_of(&self.state())
    }

    /// Observers see every state change; `generation` moves only when the window does.
    pub fn subscribe(&self) -> watch::Receiver<WindowSnapshot> {
        self.changes.subscribe()
    }

    pub fn pending_anchor(&self) -> Option<ScrollAnchor> {
        self.state().anchor
    }

    /// Removes the pending anchor so it can never be applied twice.
    pub fn take_anchor(&self) -> Option<ScrollAnchor> {
        self.state().anchor.take()
    }

    /// Fetches the chapter under the cursor and slides the window forward.
    pub async fn advance(&self) -> AdvanceOutcome {
        let (locator, _in_flight) = {
            let mut state = self.state();
            if state.fetching {
                tracing::debug!(cursor = state.cursor, "advance skipped: fetch in flight");
                return AdvanceOutcome::Busy;
            }
            if state.exhausted {
                return AdvanceOutcome::AlreadyExhausted;
            }
            let Some(locator) = self.toc.get(state.cursor).cloned() else {
                tracing::info!(cursor = state.cursor, "reached end of table of contents");
                state.exhausted = true;
                drop(state);
                self.publish();
                return AdvanceOutcome::EndOfContents;
            };
            state.fetching = true;
            (locator, InFlight { reader: self })
        };
        self.publish();

        let index = locator.index;
        let record = match self.fetcher.fetch(&locator).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(index, url = %locator.source_url, "chapter unavailable; auto-load stopped");
                let mut state = self.state();
                state.exhausted = true;
                state.anchor = None;
                return AdvanceOutcome::Missing { index };
            }
            Err(err) => {
                tracing::error!(index, url = %locator.source_url, ?err, "chapter fetch failed");
                return AdvanceOutcome::Failed { index };
            }
        };

        tracing::info!(index, id = ?record.id, title = %record.title, "chapter loaded");
        let mut state = self.state();
        state.anchor = if state.window.is_full() {
            self.capture_anchor(&state.window)
        } else {
            None
        };
        let evicted = state.window.push(record);
        state.cursor += 1;

        match evicted {
            Some(evicted) => {
                tracing::debug!(id = ?evicted.id, "evicted oldest chapter");
                AdvanceOutcome::Rotated { index, evicted }
            }
            None => AdvanceOutcome::Appended { index },
        }
    }

    fn capture_anchor(&self, window: &ChapterWindow) -> Option<ScrollAnchor> {
        let target = window.successor_of_oldest()?;
        let Some(id) = target.id else {
            tracing::warn!(title = %target.title, "anchor chapter has no identifier; scroll may jump");
            return None;
        };
        let Some(top) = self.layout.element_top(&element_key(id)) else {
            tracing::warn!(id, "anchor chapter is not rendered; scroll may jump");
            return None;
        };
        Some(ScrollAnchor {
            anchored_record_id: id,
            pixel_offset: self.layout.scroll_y() - top,
        })
    }
}

/// Clears `fetching` however the fetch ends, including when the future is dropped.
struct InFlight<'a> {
    reader: &'a Reader,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.reader.state().fetching = false;
        self.reader.publish();
    }
}

fn snapshot_of(state: &ReaderState) -> WindowSnapshot {
    WindowSnapshot {
        generation: state.window.generation(),
        cursor: state.cursor,
        fetching: state.fetching,
        exhausted: state.exhausted,
        chapters: state.window.to_vec(),
    }
}
