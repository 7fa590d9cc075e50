use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterLocator {
    pub index: usize,
    pub source_url: Url,
    pub display_title: String,
}

/// One chapter as extracted from a fetched page. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub canonical_uri: String,
    pub title: String,
    pub body_markup: String,
    pub retrieved_at: String,
}

impl ChapterRecord {
    pub fn new(
        id: Option<u64>,
        canonical_uri: impl Into<String>,
        title: impl Into<String>,
        body_markup: impl Into<String>,
    ) -> Self {
        Self {
            id,
            canonical_uri: canonical_uri.into(),
            title: title.into(),
            body_markup: body_markup.into(),
            retrieved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Key of the rendered container for this chapter, if it can be addressed.
    pub fn element_key(&self) -> Option<String> {
        self.id.map(element_key)
    }
}

pub fn element_key(id: u64) -> String {
    format!("chapter-{id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollAnchor {
    pub anchored_record_id: u64,
    /// Scroll offset minus the anchored container's top, in CSS pixels.
    pub pixel_offset: f64,
}

/// What the rendering layer observes after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub generation: u64,
    pub cursor: usize,
    pub fetching: bool,
    pub exhausted: bool,
    pub chapters: Vec<ChapterRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoadEvent {
    Seeded {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        title: String,
    },
    Loaded {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        title: String,
        window: Vec<Option<u64>>,
    },
    Evicted {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        title: String,
    },
    Failed {
        index: usize,
    },
    AnchorRestored {
        id: u64,
        scroll_y: f64,
    },
    Exhausted {
        cursor: usize,
    },
    Navigate {
        url: String,
    },
}
