//! # News Crawler
//!
//! A crawl-and-archive pipeline for New Orleans civic news. Polls the
//! RSS feeds of local newsrooms, extracts readable article text,
//! keeps what matches the civic-news keyword list, and archives each
//! relevant story to a Box folder as a Markdown document alongside a
//! JSON ledger of everything saved so far.
//!
//! ## Features
//!
//! - Polls Verite News, The Lens, and New Orleans CityBusiness feeds
//! - Extracts article text through a three-stage fallback chain
//!   (readability, structural scan, all paragraphs)
//! - Deduplicates against the remote ledger by URL-derived id
//! - Uploads Markdown documents with frontmatter metadata to Box,
//!   mirrored into a local output directory
//! - Refreshes OAuth tokens on startup and on 401, persisting the
//!   rotated pair back to `.env`
//!
//! ## Usage
//!
//! ```sh
//! newscrawler -o ./out --folder-id 318642975
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Polling**: Collect entries from each configured feed
//! 2. **Dedupe**: Drop entries whose id is already in the ledger
//! 3. **Extraction**: Fetch each page and pull out readable text
//! 4. **Relevance**: Keep articles matching the civic keyword list
//! 5. **Archive**: Write the document locally and to Box, then update
//!    the ledger once at the end of the run

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use newscrawler::cli::Cli;
use newscrawler::extract::HttpRenderer;
use newscrawler::feeds::{self, FEEDS};
use newscrawler::pipeline::Crawler;
use newscrawler::store::auth::{BoxAuthenticator, Credentials};
use newscrawler::store::BoxSession;
use newscrawler::utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newscrawler starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.out_dir, ?args.folder_id, "Parsed CLI arguments");

    // --- Credentials and remote session ---
    let credentials = match Credentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(
                error = %e,
                "Box credentials incomplete (set BOX_CLIENT_ID, BOX_CLIENT_SECRET, and a token)"
            );
            return Err(e.into());
        }
    };

    let http = feeds::http_client()?;
    let auth = BoxAuthenticator::new(http.clone(), credentials);
    auth.refresh_on_startup().await;
    let session = BoxSession::new(http.clone(), auth, args.folder_id.clone());

    // Early check: ensure the local mirror dir is writable
    if let Err(e) = ensure_writable_dir(&args.out_dir).await {
        error!(
            path = %args.out_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Crawl ----
    let renderer = HttpRenderer::new(http.clone());
    let crawler = Crawler::new(&session, &renderer, &args.out_dir);

    let crawl = async {
        let items = feeds::poll_feeds(&http, FEEDS).await;
        info!(items = items.len(), feeds = FEEDS.len(), "Collected feed entries");
        crawler.run(items).await
    };

    let stats = tokio::select! {
        result = crawl => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!(
                forfeited_records = crawler.unflushed(),
                "Interrupted by user; uploaded articles stay in the remote folder but were not added to the ledger"
            );
            return Ok(());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        saved = stats.saved,
        failed = stats.failed,
        "Execution complete"
    );

    Ok(())
}
