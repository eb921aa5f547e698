//! The crawl pipeline: feed items in, archived articles out.
//!
//! [`Crawler::run`] drives one crawl over a batch of feed items. Each
//! item lands in exactly one outcome:
//!
//! | Outcome       | Condition                                  | Counter           |
//! |---------------|--------------------------------------------|-------------------|
//! | skipped       | item has no link                           | `skipped_no_url`  |
//! | skipped       | id already present in the ledger           | `skipped_seen`    |
//! | not relevant  | empty extraction or no keyword match       | `processed` only  |
//! | failed        | local write or remote upload errored       | `failed`          |
//! | saved         | document written locally and remotely      | `saved`           |
//!
//! Only saved articles enter the ledger, which is written back once at
//! the end of the run. Items that were not relevant or that failed are
//! deliberately left out so the next crawl reconsiders them. A failure
//! on one item never aborts the run.
//!
//! A politeness delay follows each saved article, keeping fetch bursts
//! against the source sites down. Skipped and irrelevant items do not
//! pay it.

use crate::error::Result;
use crate::extract::{self, PageRenderer};
use crate::ledger;
use crate::models::{ArticleRecord, FeedItem, RunStats};
use crate::outputs::document;
use crate::relevance;
use crate::store::BoxSession;
use crate::utils::{content_preview, truncate_for_log};
use chrono::{SecondsFormat, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Pause after each saved article.
pub const POLITENESS_DELAY: Duration = Duration::from_secs(10);

/// One crawl's collaborators and knobs.
pub struct Crawler<'a> {
    session: &'a BoxSession,
    renderer: &'a dyn PageRenderer,
    out_dir: &'a str,
    politeness: Duration,
    unflushed: AtomicUsize,
}

impl<'a> Crawler<'a> {
    pub fn new(session: &'a BoxSession, renderer: &'a dyn PageRenderer, out_dir: &'a str) -> Self {
        Self {
            session,
            renderer,
            out_dir,
            politeness: POLITENESS_DELAY,
            unflushed: AtomicUsize::new(0),
        }
    }

    /// Articles uploaded this run whose records have not reached the
    /// ledger yet. Nonzero only while a run is in flight or after one
    /// was interrupted.
    pub fn unflushed(&self) -> usize {
        self.unflushed.load(Ordering::Relaxed)
    }

    /// Override the politeness delay.
    pub fn with_politeness(mut self, politeness: Duration) -> Self {
        self.politeness = politeness;
        self
    }

    /// Crawl a batch of feed items and archive the relevant ones.
    ///
    /// Loads the ledger up front, walks the items, and persists the
    /// updated ledger at the end when anything new was saved. Returns
    /// the run's counters.
    #[instrument(level = "info", skip_all, fields(items = items.len()))]
    pub async fn run(&self, items: Vec<FeedItem>) -> Result<RunStats> {
        let existing = ledger::load(self.session).await?;
        let mut seen = ledger::seen_ids(&existing);

        let mut stats = RunStats::default();
        let mut new_records: Vec<ArticleRecord> = Vec::new();
        let total = items.len();

        for (idx, item) in items.into_iter().enumerate() {
            let Some(url) = item.url.as_deref() else {
                warn!(source = %item.source, title = %truncate_for_log(&item.title, 80), "Feed item has no link; skipping");
                stats.skipped_no_url += 1;
                continue;
            };

            let id = ledger::identify(url);
            if !ledger::is_new(&id, &seen) {
                debug!(%id, %url, "Already archived; skipping");
                stats.skipped_seen += 1;
                continue;
            }

            stats.processed += 1;
            info!(
                item = idx + 1,
                total,
                source = %item.source,
                %url,
                title = %truncate_for_log(&item.title, 80),
                "Processing feed item"
            );

            let extraction = extract::extract(self.renderer, url).await;
            if extraction.body.is_empty() {
                info!(%url, "No text extracted; skipping");
                continue;
            }

            let title = if extraction.title.is_empty() {
                item.title.clone()
            } else {
                extraction.title.clone()
            };

            let matched = relevance::matching_keywords(&title, &extraction.body);
            if matched.is_empty() {
                debug!(%url, "Not relevant to New Orleans civic news");
                continue;
            }
            info!(keywords = ?matched, "Relevant article found");

            let record = ArticleRecord {
                id: id.clone(),
                source: item.source.clone(),
                url: url.to_string(),
                title,
                published: item.published.clone(),
                saved_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
                content_preview: content_preview(&extraction.body),
            };
            let filename = document::build_filename(&record);
            let rendered = document::render_document(&record, &extraction.body);

            if let Err(e) = self.persist(&filename, &rendered).await {
                if e.is_fatal() {
                    return Err(e);
                }
                error!(error = %e, %url, file = %filename, "Failed to persist article");
                stats.failed += 1;
                continue;
            }

            info!(file = %filename, "Archived article");
            stats.saved += 1;
            self.unflushed.fetch_add(1, Ordering::Relaxed);
            seen.insert(id);
            new_records.push(record);

            if self.politeness > Duration::ZERO {
                tokio::time::sleep(self.politeness).await;
            }
        }

        if new_records.is_empty() {
            info!(
                entries = stats.entries(),
                already_saved = stats.skipped_seen,
                no_url = stats.skipped_no_url,
                processed = stats.processed,
                failed = stats.failed,
                "No new articles this run"
            );
        } else {
            let added = new_records.len();
            let ledger_total = ledger::merge_and_persist(self.session, existing, new_records).await?;
            self.unflushed.store(0, Ordering::Relaxed);
            info!(
                added,
                ledger_total,
                out_dir = %self.out_dir,
                folder_id = %self.session.folder_id(),
                "Crawl complete"
            );
        }

        Ok(stats)
    }

    async fn persist(&self, filename: &str, rendered: &str) -> Result<()> {
        document::write_local(self.out_dir, filename, rendered).await?;
        self.session.upload_file(filename, rendered.as_bytes()).await?;
        Ok(())
    }
}
