//! Feed poller for the configured civic news sources.
//!
//! Polls a fixed list of RSS/Atom feeds and yields normalized [`FeedItem`]
//! descriptors. Sources are polled one at a time; a fetch or parse failure
//! on one source is logged and contributes zero items, never terminating
//! the poll. The result is a finite `Vec`, so a re-poll simply starts over.
//!
//! # Sources
//!
//! | Feed | Outlet |
//! |------|--------|
//! | `veritenews.org/feed/` | Verite News |
//! | `thelensnola.org/feed/` | The Lens |
//! | `neworleanscitybusiness.com/feed/` | CityBusiness |

use crate::error::{Error, Result};
use crate::models::FeedItem;
use futures::stream::{self, StreamExt};
use reqwest::header::ACCEPT;
use tracing::{error, info, instrument};
use url::Url;

/// New Orleans civic news feeds, polled in order.
pub const FEEDS: &[&str] = &[
    "https://veritenews.org/feed/",
    "https://thelensnola.org/feed/",
    "https://neworleanscitybusiness.com/feed/",
];

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8";

/// Build the HTTP client used for feed and page fetches.
///
/// One client is shared across the run so connection pools are reused
/// between the poller and the renderer.
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("newscrawler/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Poll every configured feed and collect the normalized entries.
///
/// Feeds are fetched sequentially. A failing source is logged with its
/// error and skipped; the remaining sources still contribute.
#[instrument(level = "info", skip_all)]
pub async fn poll_feeds(client: &reqwest::Client, feeds: &[&str]) -> Vec<FeedItem> {
    let per_feed: Vec<Vec<FeedItem>> = stream::iter(feeds)
        .then(|feed_url| async move {
            match fetch_feed(client, feed_url).await {
                Ok(items) => items,
                Err(e) => {
                    error!(error = %e, url = %feed_url, "Feed source failed; continuing without it");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let items: Vec<FeedItem> = per_feed.into_iter().flatten().collect();
    info!(count = items.len(), sources = feeds.len(), "Polled all feed sources");
    items
}

/// Fetch and parse a single feed source.
#[instrument(level = "info", skip_all, fields(url = %feed_url))]
async fn fetch_feed(client: &reqwest::Client, feed_url: &str) -> Result<Vec<FeedItem>> {
    let resp = client
        .get(feed_url)
        .header(ACCEPT, FEED_ACCEPT)
        .send()
        .await
        .map_err(|e| Error::Feed {
            url: feed_url.to_string(),
            reason: e.to_string(),
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Feed {
            url: feed_url.to_string(),
            reason: format!("status {status}"),
        });
    }

    let body = resp.bytes().await.map_err(|e| Error::Feed {
        url: feed_url.to_string(),
        reason: e.to_string(),
    })?;

    let feed = feed_rs::parser::parse(body.as_ref()).map_err(|e| Error::Feed {
        url: feed_url.to_string(),
        reason: e.to_string(),
    })?;

    let items = items_from_feed(feed, feed_url);
    info!(count = items.len(), "Fetched feed entries");
    Ok(items)
}

/// Map a parsed feed into [`FeedItem`] descriptors.
///
/// The source name is the feed's own title, falling back to the feed URL's
/// host when the feed leaves it out. Entries keep whatever the source
/// provided: a missing link stays `None`, a missing date stays empty.
fn items_from_feed(feed: feed_rs::model::Feed, feed_url: &str) -> Vec<FeedItem> {
    let source = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            Url::parse(feed_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| feed_url.to_string())
        });

    feed.entries
        .into_iter()
        .map(|entry| FeedItem {
            title: entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default(),
            url: entry.links.first().map(|l| l.href.clone()),
            published: entry
                .published
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            source: source.clone(),
        })
        .collect()
}
