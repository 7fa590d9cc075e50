//! A headless shell around the reader core.
//!
//! Lays the window out as a virtual document, scrolls it at a steady pace,
//! and runs the same trigger → advance → render → restore cycle a browser
//! shell would. Each load event is written as one JSON line.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use scraper::Html;
use tokio::time::Instant;

use crate::cli::ReadArgs;
use crate::config::ReaderConfig;
use crate::fetch::{ChapterFetcher as _, HttpChapterFetcher};
use crate::formats::{ChapterRecord, LoadEvent};
use crate::layout::{LayoutHost as _, NavigationLog, RenderedLayout};
use crate::reader::{AdvanceOutcome, Reader};
use crate::restore::{AnchorRestorer, RestoreOutcome};
use crate::toc::TableOfContents;
use crate::trigger::{ContentGeometry, ScrollTrigger, ViewportSample};

const LINE_HEIGHT: f64 = 28.0;
const CHARS_PER_LINE: usize = 72;
const HEADING_HEIGHT: f64 = 96.0;
const CHAPTER_GAP: f64 = 48.0;
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy)]
pub struct HeadlessOptions {
    pub viewport_height: f64,
    pub scroll_step: f64,
    pub max_steps: usize,
}

/// Rendered height of a chapter container in the virtual document.
pub fn chapter_height(record: &ChapterRecord) -> f64 {
    let fragment = Html::parse_fragment(&record.body_markup);
    let chars: usize = fragment
        .root_element()
        .text()
        .map(|t| t.trim().chars().count())
        .sum();
    let lines = chars.div_ceil(CHARS_PER_LINE).max(1);
    HEADING_HEIGHT + lines as f64 * LINE_HEIGHT
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    document_height: f64,
    newest_top: f64,
    newest_height: f64,
}

pub struct HeadlessShell<W: Write> {
    reader: Arc<Reader>,
    layout: Arc<RenderedLayout>,
    navigation: Arc<NavigationLog>,
    trigger: ScrollTrigger,
    restorer: AnchorRestorer,
    options: HeadlessOptions,
    out: W,
}

impl<W: Write> HeadlessShell<W> {
    pub fn new(
        reader: Arc<Reader>,
        layout: Arc<RenderedLayout>,
        navigation: Arc<NavigationLog>,
        config: &ReaderConfig,
        options: HeadlessOptions,
        out: W,
    ) -> Self {
        let trigger = ScrollTrigger::new(Arc::clone(&reader), config);
        let restorer = AnchorRestorer::new(Arc::clone(&reader), layout.clone());
        Self {
            reader,
            layout,
            navigation,
            trigger,
            restorer,
            options,
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: &LoadEvent) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, event).context("write load event json")?;
        self.out
            .write_all(b"\n")
            .context("write load event newline")?;
        self.out.flush().context("flush load events")?;
        Ok(())
    }

    fn render(&self) -> Frame {
        let snapshot = self.reader.snapshot();
        let mut tops = Vec::with_capacity(snapshot.chapters.len());
        let mut y = 0.0;
        let mut newest = (0.0, 0.0);
        for record in &snapshot.chapters {
            let height = chapter_height(record);
            if let Some(key) = record.element_key() {
                tops.push((key, y));
            }
            newest = (y, height);
            y += height + CHAPTER_GAP;
        }
        self.layout.replace_tops(tops);

        Frame {
            document_height: y,
            newest_top: newest.0,
            newest_height: newest.1,
        }
    }

    /// Scrolls until the reader is exhausted and the bottom is reached, the
    /// site takes over navigation, or the step budget runs out.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let HeadlessOptions {
            viewport_height,
            scroll_step,
            max_steps,
        } = self.options;
        let mut frame = self.render();
        self.restorer.after_render();
        let start = Instant::now();

        for step in 0..max_steps {
            let now = start + FRAME * u32::try_from(step).unwrap_or(u32::MAX);
            let max_scroll = (frame.document_height - viewport_height).max(0.0);
            let previous = self.layout.scroll_y();
            let scroll_y = (previous + scroll_step).min(max_scroll);
            if scroll_y != previous {
                self.layout.set_scroll_y(scroll_y);
                let sample = ViewportSample {
                    content: ContentGeometry {
                        top: frame.newest_top - scroll_y,
                        height: frame.newest_height,
                    },
                    viewport_height,
                };
                self.trigger.record(now, sample);
            }

            if self.trigger.tick(now) {
                let outcome = self.reader.advance().await;
                self.report(outcome)?;
                frame = self.render();
                if let RestoreOutcome::Restored { id, scroll_y } = self.restorer.after_render() {
                    self.emit(&LoadEvent::AnchorRestored { id, scroll_y })?;
                }
                if let Some(url) = self.navigation.requested().into_iter().next() {
                    self.emit(&LoadEvent::Navigate {
                        url: url.to_string(),
                    })?;
                    return Ok(());
                }
                continue;
            }

            // At the bottom with no burst left to evaluate, progress cannot change.
            if scroll_y >= max_scroll && !self.trigger.is_pending() {
                if self.reader.status().exhausted {
                    tracing::info!(step, "reached the end of the last chapter");
                } else {
                    tracing::warn!(
                        step,
                        scroll_y,
                        "reached the bottom without crossing the prefetch threshold; stopping"
                    );
                }
                return Ok(());
            }
        }

        tracing::info!(max_steps, "step budget exhausted");
        Ok(())
    }

    fn report(&mut self, outcome: AdvanceOutcome) -> anyhow::Result<()> {
        let status = self.reader.status();
        match outcome {
            AdvanceOutcome::Busy | AdvanceOutcome::AlreadyExhausted => Ok(()),
            AdvanceOutcome::EndOfContents | AdvanceOutcome::Missing { .. } => {
                self.emit(&LoadEvent::Exhausted {
                    cursor: status.cursor,
                })
            }
            AdvanceOutcome::Failed { index } => self.emit(&LoadEvent::Failed { index }),
            AdvanceOutcome::Appended { index } => self.emit_loaded(index),
            AdvanceOutcome::Rotated { index, evicted } => {
                self.emit(&LoadEvent::Evicted {
                    id: evicted.id,
                    title: evicted.title,
                })?;
                self.emit_loaded(index)
            }
        }
    }

    fn emit_loaded(&mut self, index: usize) -> anyhow::Result<()> {
        let snapshot = self.reader.snapshot();
        let window = snapshot.chapters.iter().map(|r| r.id).collect();
        let Some(newest) = snapshot.chapters.last() else {
            return Ok(());
        };
        self.emit(&LoadEvent::Loaded {
            index,
            id: newest.id,
            title: newest.title.clone(),
            window,
        })
    }
}

pub async fn run(args: ReadArgs) -> anyhow::Result<()> {
    let mut config = match args.config.as_deref() {
        Some(path) => ReaderConfig::load(Path::new(path))?,
        None => ReaderConfig::default(),
    };
    if let Some(capacity) = args.window_capacity {
        config.window_capacity = capacity;
    }
    if let Some(threshold) = args.threshold {
        config.prefetch_threshold_percent = threshold;
    }
    config.validate().context("validate reader config")?;

    let toc = TableOfContents::load(Path::new(&args.toc)).context("load table of contents")?;
    let start = toc.get(args.start).cloned().ok_or_else(|| {
        anyhow::anyhow!(
            "--start {} is outside the table of contents ({} chapters)",
            args.start,
            toc.len()
        )
    })?;

    let layout = Arc::new(RenderedLayout::new());
    let navigation = Arc::new(NavigationLog::new());
    let fetcher = Arc::new(
        HttpChapterFetcher::new(&config, navigation.clone()).context("build chapter fetcher")?,
    );

    let mut out = std::io::stdout();
    let Some(seed) = fetcher.fetch(&start).await.context("fetch start chapter")? else {
        if let Some(url) = navigation.requested().into_iter().next() {
            let event = LoadEvent::Navigate {
                url: url.to_string(),
            };
            serde_json::to_writer(&mut out, &event).context("write load event json")?;
            out.write_all(b"\n").context("write load event newline")?;
            return Ok(());
        }
        anyhow::bail!("start chapter could not be loaded: {}", start.source_url);
    };

    let seeded = LoadEvent::Seeded {
        index: start.index,
        id: seed.id,
        title: seed.title.clone(),
    };
    let reader = Arc::new(
        Reader::new(
            toc,
            start.index,
            seed,
            config.window_capacity,
            fetcher,
            layout.clone(),
        )
        .context("start reader session")?,
    );

    let options = HeadlessOptions {
        viewport_height: args.viewport_height,
        scroll_step: args.scroll_step,
        max_steps: args.max_steps,
    };
    let mut shell = HeadlessShell::new(reader, layout, navigation, &config, options, out);
    shell.emit(&seeded)?;
    shell.run().await
}
