//! Markdown document rendering, naming, and parsing.
//!
//! Every saved article becomes one Markdown file with a frontmatter
//! header carrying the record metadata:
//!
//! ```text
//! ---
//! source: Verite News
//! title: City Council approves budget
//! url: https://veritenews.org/2025/05/06/city-council-budget/
//! published: 2025-05-06T09:30:00+00:00
//! saved_at: 2025-05-06T15:02:11+00:00
//! ---
//!
//! Full article text...
//! ```
//!
//! Filenames follow `{date}_{id}_{title}.md`, where the date is the
//! first ten characters of the published timestamp (falling back to
//! today's UTC date), the id is the 16-character article id, and the
//! title is sanitized for filesystem use. The date and id segments
//! never contain underscores, so the id can be recovered from the
//! second `_`-separated field of any filename produced here.

use crate::error::Result;
use crate::models::ArticleRecord;
use crate::utils::sanitize_title;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// A document split back into its frontmatter fields and body text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl ParsedDocument {
    /// Look up a frontmatter field by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Render a record and its extracted body as a Markdown document.
pub fn render_document(record: &ArticleRecord, body: &str) -> String {
    format!(
        "---\nsource: {}\ntitle: {}\nurl: {}\npublished: {}\nsaved_at: {}\n---\n\n{}\n",
        record.source, record.title, record.url, record.published, record.saved_at, body
    )
}

/// Split a Markdown document into frontmatter fields and body.
///
/// Returns `None` when the text does not carry a frontmatter header.
/// Frontmatter lines split on the first `:`; lines without one are
/// ignored. The body is everything between the closing delimiter and
/// the next `---` (if any), trimmed.
pub fn parse_document(text: &str) -> Option<ParsedDocument> {
    let parts: Vec<&str> = text.split("---").collect();
    if parts.len() < 3 {
        return None;
    }

    let fields = parts[1]
        .trim()
        .lines()
        .filter_map(|line| {
            line.split_once(':')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect();

    Some(ParsedDocument {
        fields,
        body: parts[2].trim().to_string(),
    })
}

/// Build the document filename for a record.
///
/// # Returns
///
/// `{date}_{id}_{title}.md`, with the published date when the record
/// has one and today's UTC date otherwise.
pub fn build_filename(record: &ArticleRecord) -> String {
    let date = match record.published_date() {
        Some(date) => date.to_string(),
        None => Utc::now().format("%Y-%m-%d").to_string(),
    };
    format!("{}_{}_{}.md", date, record.id, sanitize_title(&record.title))
}

/// Recover the article id from a document filename.
///
/// The id is the second `_`-separated field and must be exactly 16
/// lowercase hex characters; anything else returns `None`, so files
/// that were renamed or did not come from this crawler are rejected
/// rather than indexed under a bogus id.
pub fn id_from_filename(name: &str) -> Option<&str> {
    let stem = name.strip_suffix(".md").unwrap_or(name);
    let id = stem.split('_').nth(1)?;
    if id.len() == 16 && id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
        Some(id)
    } else {
        None
    }
}

/// Write a document into the local output directory.
///
/// Creates the directory if needed and returns the full path written.
#[instrument(level = "info", skip_all, fields(%out_dir, %name))]
pub async fn write_local(out_dir: &str, name: &str, content: &str) -> Result<PathBuf> {
    if let Err(e) = fs::create_dir_all(out_dir).await {
        error!(%out_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = Path::new(out_dir).join(name);
    fs::write(&path, content).await?;
    info!(path = %path.display(), "Wrote article document");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ArticleRecord {
        ArticleRecord {
            id: "1f2e3d4c5b6a7988".to_string(),
            source: "Verite News".to_string(),
            url: "https://veritenews.org/2025/05/06/city-council-budget/".to_string(),
            title: "City Council approves budget".to_string(),
            published: "2025-05-06T09:30:00+00:00".to_string(),
            saved_at: "2025-05-06T15:02:11+00:00".to_string(),
            content_preview: "The council voted...".to_string(),
        }
    }

    #[test]
    fn test_render_document_layout() {
        let doc = render_document(&sample_record(), "The council voted 5-2.");
        assert_eq!(
            doc,
            "---\n\
             source: Verite News\n\
             title: City Council approves budget\n\
             url: https://veritenews.org/2025/05/06/city-council-budget/\n\
             published: 2025-05-06T09:30:00+00:00\n\
             saved_at: 2025-05-06T15:02:11+00:00\n\
             ---\n\
             \n\
             The council voted 5-2.\n"
        );
    }

    #[test]
    fn test_parse_recovers_rendered_document() {
        let doc = render_document(&sample_record(), "Body text here.");
        let parsed = parse_document(&doc).unwrap();

        assert_eq!(parsed.field("source"), Some("Verite News"));
        assert_eq!(parsed.field("title"), Some("City Council approves budget"));
        assert_eq!(
            parsed.field("url"),
            Some("https://veritenews.org/2025/05/06/city-council-budget/")
        );
        assert_eq!(parsed.field("published"), Some("2025-05-06T09:30:00+00:00"));
        assert_eq!(parsed.field("saved_at"), Some("2025-05-06T15:02:11+00:00"));
        assert_eq!(parsed.body, "Body text here.");
    }

    #[test]
    fn test_parse_keeps_value_after_first_colon() {
        let doc = "---\ntitle: Budget: the 2025 review\n---\n\nText.\n";
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.field("title"), Some("Budget: the 2025 review"));
    }

    #[test]
    fn test_parse_without_frontmatter_is_none() {
        assert!(parse_document("Just a plain file.").is_none());
        assert!(parse_document("--- only one delimiter").is_none());
    }

    #[test]
    fn test_parse_body_stops_at_next_delimiter() {
        let doc = "---\ntitle: T\n---\n\nFirst part.\n---\nSecond part.\n";
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.body, "First part.");
    }

    #[test]
    fn test_build_filename_uses_published_date() {
        let name = build_filename(&sample_record());
        assert_eq!(
            name,
            "2025-05-06_1f2e3d4c5b6a7988_City Council approves budget.md"
        );
    }

    #[test]
    fn test_build_filename_sanitizes_title() {
        let mut record = sample_record();
        record.title = "Budget: 2024/25 Review!".to_string();
        let name = build_filename(&record);
        assert_eq!(name, "2025-05-06_1f2e3d4c5b6a7988_Budget 202425 Review.md");
    }

    #[test]
    fn test_build_filename_without_published_uses_today() {
        let mut record = sample_record();
        record.published = String::new();
        let name = build_filename(&record);

        let (date, rest) = name.split_once('_').unwrap();
        assert_eq!(date.len(), 10);
        assert!(date.chars().all(|c| c.is_ascii_digit() || c == '-'));
        assert!(rest.starts_with("1f2e3d4c5b6a7988_"));
    }

    #[test]
    fn test_id_from_filename_accepts_crawler_names() {
        let name = build_filename(&sample_record());
        assert_eq!(id_from_filename(&name), Some("1f2e3d4c5b6a7988"));
        assert_eq!(
            id_from_filename("2025-05-06_1f2e3d4c5b6a7988.md"),
            Some("1f2e3d4c5b6a7988")
        );
    }

    #[test]
    fn test_id_from_filename_rejects_foreign_names() {
        assert_eq!(id_from_filename("notes.md"), None);
        assert_eq!(id_from_filename("2025-05-06_short_title.md"), None);
        assert_eq!(id_from_filename("2025-05-06_1F2E3D4C5B6A7988_t.md"), None);
        assert_eq!(id_from_filename("2025-05-06_1f2e3d4c5b6a79zz_t.md"), None);
    }

    #[tokio::test]
    async fn test_write_local_creates_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("out").to_string_lossy().to_string();

        let path = write_local(&out_dir, "doc.md", "content").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "content");
    }
}
