use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::ReaderConfig;
use crate::reader::Reader;

pub const DEFAULT_PREFETCH_THRESHOLD_PERCENT: f64 = 60.0;
pub const DEFAULT_THROTTLE_MS: u64 = 100;

/// Bounding box of a chapter's content, relative to the viewport top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentGeometry {
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
    pub content: ContentGeometry,
    pub viewport_height: f64,
}

/// Share of the content that has passed above the viewport, in `[0, 100]`.
pub fn scroll_progress(content: ContentGeometry, viewport_height: f64) -> f64 {
    let ContentGeometry { top, height } = content;
    if height.is_nan() || height <= 0.0 {
        return 0.0;
    }
    if top <= -height {
        return 100.0;
    }
    if top >= viewport_height {
        return 0.0;
    }
    (100.0 * (-top).max(0.0) / height).min(100.0)
}

pub fn should_prefetch(progress: f64, threshold: f64, fetching: bool, exhausted: bool) -> bool {
    progress > threshold && !fetching && !exhausted
}

/// Collapses bursts of scroll events into one trailing evaluation.
///
/// The first event of a burst opens a window of `interval`; nothing fires on
/// that leading edge. When the window closes, one evaluation runs against the
/// latest geometry, so evaluations are at least `interval` apart.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Returns when the pending evaluation is due.
    pub fn record(&mut self, now: Instant) -> Instant {
        *self.deadline.get_or_insert(now + self.interval)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once per burst, when its window has closed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub struct ScrollTrigger {
    reader: Arc<Reader>,
    throttle: Throttle,
    threshold: f64,
    latest: Option<ViewportSample>,
}

impl ScrollTrigger {
    pub fn new(reader: Arc<Reader>, config: &ReaderConfig) -> Self {
        Self {
            reader,
            throttle: Throttle::new(config.throttle()),
            threshold: config.prefetch_threshold_percent,
            latest: None,
        }
    }

    /// Decides whether `sample` should start a fetch right now.
    pub fn evaluate(&self, sample: ViewportSample) -> bool {
        let progress = scroll_progress(sample.content, sample.viewport_height);
        let status = self.reader.status();
        let fire = should_prefetch(progress, self.threshold, status.fetching, status.exhausted);
        tracing::debug!(
            progress,
            fetching = status.fetching,
            exhausted = status.exhausted,
            fire,
            "scroll check"
        );
        fire
    }

    /// Notes a scroll event stamped by the caller's clock. Never evaluates:
    /// the leading edge of a burst is suppressed.
    pub fn record(&mut self, now: Instant, sample: ViewportSample) -> Instant {
        self.latest = Some(sample);
        self.throttle.record(now)
    }

    /// Call on every frame. True once the burst window has closed and the
    /// last recorded sample crosses the threshold.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.throttle.poll(now) {
            return false;
        }
        match self.latest {
            Some(sample) => self.evaluate(sample),
            None => false,
        }
    }

    /// A burst is open and its trailing evaluation has not run yet.
    pub fn is_pending(&self) -> bool {
        self.throttle.deadline().is_some()
    }

    /// Consumes viewport samples until the sender side closes.
    pub async fn run(mut self, mut samples: mpsc::Receiver<ViewportSample>) {
        loop {
            let deadline = self.throttle.deadline();
            tokio::select! {
                biased;
                sample = samples.recv() => {
                    let Some(sample) = sample else {
                        break;
                    };
                    self.record(Instant::now(), sample);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.tick(Instant::now()) {
                        let reader = Arc::clone(&self.reader);
                        tokio::spawn(async move {
                            reader.advance().await;
                        });
                    }
                }
            }
        }
    }
}
