//! String and filesystem helpers shared across the pipeline.
//!
//! - Title sanitization for the document filename convention
//! - Body previews for ledger records
//! - Log-safe truncation for long titles and response bodies
//! - Output-directory validation before the crawl starts

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Maximum length of the sanitized title segment in document filenames.
const MAX_TITLE_SEGMENT: usize = 50;

/// Length of the body preview stored on each ledger record.
const PREVIEW_CHARS: usize = 200;

/// Reduce a title to the character set allowed in document filenames.
///
/// Keeps alphanumerics, spaces, hyphens, and underscores; drops everything
/// else. Trailing whitespace is trimmed and the result is capped at 50
/// characters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_title("Budget: 2024/25 Review!"), "Budget 202425 Review");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end().chars().take(MAX_TITLE_SEGMENT).collect()
}

/// First 200 characters of a body, with `"..."` appended when truncated.
///
/// Stored on [`crate::models::ArticleRecord`] so the ledger stays skimmable
/// without opening the per-article documents.
pub fn content_preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        let head: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and a count of
/// what was dropped, so progress lines stay one line.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…(+{} chars)", total - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file. Run before any network
/// activity so a bad output path fails the run up front.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Small sync write; simpler error surface than async probes.
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
