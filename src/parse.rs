use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::ParseArgs;
use crate::config::ReaderConfig;
use crate::formats::ChapterRecord;

pub const MISSING_TITLE: &str = "Chapter Title Missing";
pub const MISSING_BODY_MARKUP: &str =
    r#"<p class="chapter-error">Error: chapter content could not be found on the source page.</p>"#;

/// Where the supported reading template keeps each piece of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub bookmark_selector: String,
    pub bookmark_id_attr: String,
    pub current_chapter_selector: String,
    pub current_chapter_id_attr: String,
    pub title_selector: String,
    /// Tried in order; the first match wins.
    pub body_selectors: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            bookmark_selector: r#".wp-manga-action-button[data-action="bookmark"]"#.to_owned(),
            bookmark_id_attr: "data-chapter".to_owned(),
            current_chapter_selector: "#wp-manga-current-chap".to_owned(),
            current_chapter_id_attr: "data-id".to_owned(),
            title_selector: "#chapter-heading".to_owned(),
            body_selectors: vec![
                ".reading-content .text-left".to_owned(),
                ".reading-content .text-right".to_owned(),
                ".reading-content".to_owned(),
                ".entry-content".to_owned(),
            ],
        }
    }
}

#[derive(Debug)]
struct IdSource {
    selector: Selector,
    attr: String,
}

#[derive(Debug)]
pub struct PageParser {
    id_sources: [IdSource; 2],
    title: Selector,
    bodies: Vec<Selector>,
}

impl PageParser {
    pub fn new(profile: &SiteProfile) -> anyhow::Result<Self> {
        if profile.body_selectors.is_empty() {
            anyhow::bail!("site profile needs at least one body selector");
        }
        let bodies = profile
            .body_selectors
            .iter()
            .map(String::as_str)
            .map(compile)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            id_sources: [
                IdSource {
                    selector: compile(&profile.bookmark_selector)?,
                    attr: profile.bookmark_id_attr.clone(),
                },
                IdSource {
                    selector: compile(&profile.current_chapter_selector)?,
                    attr: profile.current_chapter_id_attr.clone(),
                },
            ],
            title: compile(&profile.title_selector)?,
            bodies,
        })
    }

    pub fn parse_str(&self, html: &str, source_uri: &Url) -> ChapterRecord {
        let document = Html::parse_document(html);
        self.parse(&document, source_uri)
    }

    /// Never fails: missing pieces degrade to placeholders.
    pub fn parse(&self, document: &Html, source_uri: &Url) -> ChapterRecord {
        let id = self.extract_id(document);
        if id.is_none() {
            tracing::warn!(url = %source_uri, "chapter identifier not found on page");
        }

        let title = document
            .select(&self.title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| MISSING_TITLE.to_owned());

        let body_markup = match self.extract_body(document) {
            Some(body) => body,
            None => {
                tracing::warn!(url = %source_uri, "chapter content container not found; using placeholder");
                MISSING_BODY_MARKUP.to_owned()
            }
        };

        ChapterRecord::new(id, source_uri.as_str(), title, body_markup)
    }

    fn extract_id(&self, document: &Html) -> Option<u64> {
        self.id_sources.iter().find_map(|source| {
            document
                .select(&source.selector)
                .next()
                .and_then(|el| el.value().attr(&source.attr))
                .and_then(|raw| raw.trim().parse::<u64>().ok())
        })
    }

    fn extract_body(&self, document: &Html) -> Option<String> {
        self.bodies.iter().find_map(|selector| {
            document
                .select(selector)
                .next()
                .map(|el| el.inner_html().trim().to_owned())
        })
    }
}

/// Parses a saved page and prints the record as JSON.
pub fn run(args: ParseArgs) -> anyhow::Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => ReaderConfig::load(Path::new(path))?,
        None => ReaderConfig::default(),
    };
    let parser = PageParser::new(&config.site).context("compile site profile")?;
    let url = Url::parse(&args.url).context("parse --url")?;
    let html =
        std::fs::read_to_string(&args.html).with_context(|| format!("read page: {}", args.html))?;

    let record = parser.parse_str(&html, &url);
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &record).context("write chapter record json")?;
    stdout.write_all(b"\n").context("write newline")?;
    Ok(())
}

fn compile(selector: &str) -> anyhow::Result<Selector> {
    Selector::parse(selector).map_err(|err| anyhow::anyhow!("invalid selector {selector:?}: {err}"))
}
