use std::sync::Arc;

use tokio::sync::watch;

use crate::formats::{WindowSnapshot, element_key};
use crate::layout::{LayoutHost, ScrollBehavior};
use crate::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestoreOutcome {
    /// The window has not changed since the last render.
    Unchanged,
    NoAnchor,
    Restored { id: u64, scroll_y: f64 },
    /// The anchored chapter is no longer rendered; the anchor was dropped.
    TargetMissing { id: u64 },
}

/// Re-homes the scroll offset after a window mutation has been rendered.
///
/// Call [`AnchorRestorer::after_render`] once the rendering layer has laid
/// out the latest window. The first render after subscribing is the initial
/// mount and never restores anything.
pub struct AnchorRestorer {
    reader: Arc<Reader>,
    layout: Arc<dyn LayoutHost>,
    changes: watch::Receiver<WindowSnapshot>,
    seen_generation: u64,
}

impl AnchorRestorer {
    pub fn new(reader: Arc<Reader>, layout: Arc<dyn LayoutHost>) -> Self {
        let changes = reader.subscribe();
        let seen_generation = changes.borrow().generation;
        Self {
            reader,
            layout,
            changes,
            seen_generation,
        }
    }

    pub fn after_render(&mut self) -> RestoreOutcome {
        let generation = self.changes.borrow_and_update().generation;
        if generation == self.seen_generation {
            return RestoreOutcome::Unchanged;
        }
        self.seen_generation = generation;

        let Some(anchor) = self.reader.take_anchor() else {
            return RestoreOutcome::NoAnchor;
        };
        let id = anchor.anchored_record_id;
        match self.layout.element_top(&element_key(id)) {
            Some(top) => {
                let scroll_y = top + anchor.pixel_offset;
                self.layout.scroll_to(scroll_y, ScrollBehavior::Instant);
                tracing::debug!(id, scroll_y, "scroll anchor restored");
                RestoreOutcome::Restored { id, scroll_y }
            }
            None => {
                tracing::warn!(id, "scroll anchor target vanished before restore");
                RestoreOutcome::TargetMissing { id }
            }
        }
    }
}
