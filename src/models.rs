//! Data models for feed entries, article records, and run bookkeeping.
//!
//! This module defines the core data structures used throughout the crawler:
//! - [`FeedItem`]: A normalized feed entry as produced by the feed poller
//! - [`ArticleRecord`]: The persistent unit of the article ledger
//! - [`ExtractionResult`]: Title and body text recovered from a rendered page
//! - [`RunStats`]: Counters accumulated over one crawl run
//!
//! [`ArticleRecord`] is the only persisted type; its field order matches the
//! JSON objects stored in the remote ledger.

use serde::{Deserialize, Serialize};

/// A normalized entry from a syndication feed.
///
/// Produced by the feed poller and consumed immediately by the pipeline;
/// never persisted. Entries without a link keep `url = None` and are
/// counted and skipped by the driver.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// Entry title, trimmed. Empty when the feed omits it.
    pub title: String,
    /// Entry link, absent when the feed entry has none.
    pub url: Option<String>,
    /// Publication timestamp as the source provided it. Not validated.
    pub published: String,
    /// Feed title, falling back to the feed URL's host.
    pub source: String,
}

/// One article in the durable ledger.
///
/// `id` is the first 16 hex digits of the SHA-256 of `url`, so equal URLs
/// always collapse to the same record. The same id keys the per-article
/// document filename, which is why it sticks to lowercase hex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// 16 lowercase hex characters derived from `url`.
    pub id: String,
    /// Name of the feed the article was discovered through.
    pub source: String,
    /// Canonical article URL.
    pub url: String,
    /// Article title (extracted, falling back to the feed entry title).
    pub title: String,
    /// Source-provided publication timestamp; possibly empty.
    pub published: String,
    /// ISO-8601 UTC timestamp set when the record was written.
    pub saved_at: String,
    /// First 200 characters of the body, with `...` appended when truncated.
    pub content_preview: String,
}

impl ArticleRecord {
    /// The date portion of `published` (first 10 characters), or `None`
    /// when the source gave no timestamp. Used for filename prefixes.
    pub fn published_date(&self) -> Option<&str> {
        if self.published.is_empty() {
            None
        } else {
            Some(self.published.get(..10).unwrap_or(&self.published))
        }
    }
}

/// Title and body text recovered from a rendered page.
///
/// Both fields may legitimately be empty when every extraction stage came
/// up short; callers treat that as "not relevant".
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Recovered title; empty when no stage produced one.
    pub title: String,
    /// Recovered body text, paragraphs joined by blank lines.
    pub body: String,
}

/// Counters accumulated over one crawl run, reported in the final summary.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Entries whose id was already in the ledger.
    pub skipped_seen: usize,
    /// Entries that carried no URL.
    pub skipped_no_url: usize,
    /// Entries that entered extraction.
    pub processed: usize,
    /// Entries that errored during extraction or persistence.
    pub failed: usize,
    /// New records admitted and persisted this run.
    pub saved: usize,
}

impl RunStats {
    /// Total feed entries examined this run.
    pub fn entries(&self) -> usize {
        self.processed + self.skipped_seen + self.skipped_no_url
    }
}
