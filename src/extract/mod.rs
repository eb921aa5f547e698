//! Content extraction: page rendering plus an ordered fallback chain.
//!
//! Rendering and extraction are deliberately separate. A [`PageRenderer`]
//! turns a URL into a [`RenderedPage`]; the stages in [`stages`] are pure
//! functions over that page, applied in order until one yields a body that
//! clears the minimum-length bar. Browser-driven rendering stays behind the
//! trait: the default [`HttpRenderer`] fetches the page over HTTP with a
//! bounded wait and hands whatever HTML came back to the chain.
//!
//! # Fallback chain
//!
//! | Stage | Strategy |
//! |-------|----------|
//! | readability | whole-page readability extraction, also yields the title |
//! | structural | `article`/content-class container, `p`/`h2`/`h3` blocks |
//! | paragraphs | every `p` on the page |
//!
//! The first stage to produce at least 100 characters of body wins; if none
//! does, the last stage's output stands, possibly empty. Callers treat an
//! empty result as "not relevant".

pub mod stages;

use crate::error::{Error, Result};
use crate::models::ExtractionResult;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub use stages::MIN_BODY_CHARS;

/// How long the renderer waits for a page before giving up on it.
const RENDER_WAIT: Duration = Duration::from_secs(15);

/// A page fetched by the renderer, ready for the extraction stages.
pub struct RenderedPage {
    /// The URL the page was rendered from.
    pub url: Url,
    /// The rendered HTML.
    pub html: String,
}

/// Renders a URL to HTML.
///
/// The session behind one `render` call is scoped to that call: whatever
/// the implementation holds (connections, browser contexts) is released
/// when the call returns, on success and on error alike.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage>;
}

/// Plain-HTTP renderer used by default.
///
/// Fetches the page body with a bounded per-request wait. Response status
/// is deliberately ignored: the chain runs over whatever HTML is present,
/// and pages that render to nothing useful fall out at the relevance
/// filter.
pub struct HttpRenderer {
    client: reqwest::Client,
    wait: Duration,
}

impl HttpRenderer {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            wait: RENDER_WAIT,
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let parsed = Url::parse(url).map_err(|e| Error::Render {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let resp = self
            .client
            .get(parsed.clone())
            .timeout(self.wait)
            .send()
            .await
            .map_err(|e| Error::Render {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let html = resp.text().await.map_err(|e| Error::Render {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!(bytes = html.len(), "Rendered page");
        Ok(RenderedPage { url: parsed, html })
    }
}

type Stage = fn(&RenderedPage) -> ExtractionResult;

/// The fallback chain, in the order it is attempted.
const STAGES: &[(&str, Stage)] = &[
    ("readability", stages::readability_pass),
    ("structural", stages::structural_pass),
    ("paragraphs", stages::all_paragraphs_pass),
];

/// Render a URL and run the fallback chain over it.
///
/// Render failures are logged and collapse to an empty result, which the
/// relevance filter then rejects; they never abort the run.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn extract(renderer: &dyn PageRenderer, url: &str) -> ExtractionResult {
    let page = match renderer.render(url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, %url, "Render failed; treating page as empty");
            return ExtractionResult::default();
        }
    };
    extract_from_html(&page)
}

/// Run the standard fallback chain over an already-rendered page.
pub fn extract_from_html(page: &RenderedPage) -> ExtractionResult {
    run_stages(page, STAGES)
}

/// Apply stages in order; the first body meeting the bar wins. The title is
/// the first non-empty title any attempted stage produced, falling back to
/// the page's `<title>` element.
fn run_stages(page: &RenderedPage, chain: &[(&str, Stage)]) -> ExtractionResult {
    let mut title = String::new();
    let mut body = String::new();
    let mut settled = "none";

    for (name, stage) in chain.iter().copied() {
        let result = stage(page);
        if title.is_empty() && !result.title.is_empty() {
            title = result.title;
        }
        body = result.body;
        settled = name;
        if body.chars().count() >= MIN_BODY_CHARS {
            break;
        }
    }

    if title.is_empty() {
        title = stages::html_title(page).unwrap_or_default();
    }

    debug!(
        stage = settled,
        chars = body.chars().count(),
        "Extraction settled"
    );
    ExtractionResult { title, body }
}
