use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;

use crate::config::ReaderConfig;
use crate::formats::{ChapterLocator, ChapterRecord};
use crate::layout::Navigator;
use crate::parse::PageParser;

/// `Ok(None)` covers every HTTP-level failure; `Err` is reserved for the unexpected.
#[async_trait]
pub trait ChapterFetcher: Send + Sync {
    async fn fetch(&self, locator: &ChapterLocator) -> anyhow::Result<Option<ChapterRecord>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    NotFound,
    AccessDenied,
    Failed,
}

pub fn classify_status(status: StatusCode) -> FetchStatus {
    if status.is_success() {
        return FetchStatus::Success;
    }
    match status {
        StatusCode::NOT_FOUND => FetchStatus::NotFound,
        StatusCode::FORBIDDEN => FetchStatus::AccessDenied,
        _ => FetchStatus::Failed,
    }
}

pub struct HttpChapterFetcher {
    client: reqwest::Client,
    parser: PageParser,
    navigator: Arc<dyn Navigator>,
}

impl HttpChapterFetcher {
    pub fn new(config: &ReaderConfig, navigator: Arc<dyn Navigator>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("build chapter http client")?;
        let parser = PageParser::new(&config.site).context("compile site profile")?;

        Ok(Self {
            client,
            parser,
            navigator,
        })
    }
}

#[async_trait]
impl ChapterFetcher for HttpChapterFetcher {
    async fn fetch(&self, locator: &ChapterLocator) -> anyhow::Result<Option<ChapterRecord>> {
        let url = &locator.source_url;
        tracing::debug!(index = locator.index, url = %url, "fetching chapter");

        let response = match self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %url, ?err, "chapter request failed");
                return Ok(None);
            }
        };

        let status = response.status();
        match classify_status(status) {
            FetchStatus::Success => {}
            FetchStatus::NotFound => {
                tracing::info!(url = %url, "chapter does not exist");
                return Ok(None);
            }
            FetchStatus::AccessDenied => {
                tracing::warn!(url = %url, "access denied; falling back to the site page");
                self.navigator.navigate(url);
                return Ok(None);
            }
            FetchStatus::Failed => {
                tracing::warn!(url = %url, status = status.as_u16(), "unexpected chapter response");
                return Ok(None);
            }
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(url = %url, ?err, "read chapter body");
                return Ok(None);
            }
        };

        Ok(Some(self.parser.parse_str(&html, url)))
    }
}
