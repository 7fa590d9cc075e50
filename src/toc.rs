use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::formats::ChapterLocator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocEntry {
    pub source_url: String,
    pub display_title: String,
}

/// On-disk table of contents (YAML or JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub chapters: Vec<TocEntry>,
}

/// Fixed for the whole session; positions double as fetch cursors.
#[derive(Debug, Clone, Default)]
pub struct TableOfContents {
    locators: Vec<ChapterLocator>,
}

impl TableOfContents {
    pub fn from_entries(entries: impl IntoIterator<Item = TocEntry>) -> anyhow::Result<Self> {
        let mut locators = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let source_url = Url::parse(entry.source_url.trim())
                .with_context(|| format!("parse chapter url #{index}: {}", entry.source_url))?;
            if source_url.scheme() != "http" && source_url.scheme() != "https" {
                anyhow::bail!("chapter url #{index} must be http/https: {source_url}");
            }
            locators.push(ChapterLocator {
                index,
                source_url,
                display_title: entry.display_title.trim().to_owned(),
            });
        }
        Ok(Self { locators })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read table of contents: {}", path.display()))?;
        let file: TocFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("parse table of contents: {}", path.display()))?;
        if file.chapters.is_empty() {
            anyhow::bail!("table of contents has no chapters: {}", path.display());
        }
        Self::from_entries(file.chapters)
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChapterLocator> {
        self.locators.get(index)
    }
}
