//! Embed archived articles into a Chroma collection.
//!
//! Walks the crawler's local article mirror, parses each Markdown
//! document back into frontmatter and body, and upserts them into a
//! Chroma collection keyed by article id. Embeddings are computed by
//! the collection's embedding function on the Chroma server side; this
//! tool ships only ids, metadata, and text.
//!
//! Files that do not parse, or whose names do not carry a valid
//! article id, are logged and skipped. The run fails only when the
//! vector index itself rejects an operation. The Chroma endpoint is
//! the client default, `http://localhost:8000`.
//!
//! ## Usage
//!
//! ```sh
//! vectorize --articles-dir ./out --collection nola_articles
//! ```

use chromadb::v1::client::ChromaClient;
use chromadb::v1::collection::CollectionEntries;
use clap::Parser;
use newscrawler::error::Error;
use newscrawler::outputs::document::{id_from_filename, parse_document};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

/// Documents sent per upsert call.
const EMBED_BATCH: usize = 32;

/// Command-line arguments for the vectorizer.
#[derive(Parser, Debug)]
#[command(author, version, about = "Embed archived articles into a Chroma collection")]
struct Cli {
    /// Directory holding the archived article documents
    #[arg(short, long, env = "ARTICLES_DIR", default_value = "out")]
    articles_dir: String,

    /// Chroma collection that receives the documents
    #[arg(long, default_value = "nola_articles")]
    collection: String,
}

/// One parsed article ready for the index.
struct ArticleDoc {
    id: String,
    metadata: Map<String, Value>,
    body: String,
}

#[instrument]
fn main() -> Result<(), Box<dyn std::error::Error>> {
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

    let args = Cli::parse();
    info!(dir = %args.articles_dir, collection = %args.collection, "vectorize starting up");

    let client = ChromaClient::new(Default::default());
    let collection_metadata = Map::from_iter([(
        "hnsw:space".to_string(),
        Value::String("cosine".to_string()),
    )]);
    let collection = client
        .get_or_create_collection(&args.collection, Some(collection_metadata))
        .map_err(|e| Error::VectorIndex(e.to_string()))?;

    let (docs, skipped) = collect_documents(&args.articles_dir);
    let found = docs.len() + skipped;
    info!(found, dir = %args.articles_dir, "Found markdown files");

    let mut embedded = 0usize;
    for chunk in docs.chunks(EMBED_BATCH) {
        let entries = CollectionEntries {
            ids: chunk.iter().map(|d| d.id.as_str()).collect(),
            embeddings: None,
            metadatas: Some(chunk.iter().map(|d| d.metadata.clone()).collect()),
            documents: Some(chunk.iter().map(|d| d.body.as_str()).collect()),
        };
        collection
            .upsert(entries, None)
            .map_err(|e| Error::VectorIndex(e.to_string()))?;
        embedded += chunk.len();
        info!(embedded, total = docs.len(), "Upserted batch");
    }

    info!(found, embedded, skipped, "Vectorize complete");
    Ok(())
}

/// Gather every parseable article document under `dir`.
///
/// Returns the documents in filename order and the number of Markdown
/// files skipped (unreadable, malformed, or misnamed). A missing
/// directory logs a warning and yields nothing; dir problems are never
/// a hard failure here.
fn collect_documents(dir: &str) -> (Vec<ArticleDoc>, usize) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(%dir, error = %e, "Could not read articles directory");
            return (Vec::new(), 0);
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();

    let mut docs = Vec::new();
    let mut skipped = 0usize;
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            skipped += 1;
            continue;
        };
        let Some(id) = id_from_filename(name) else {
            warn!(file = %name, "No article id in filename; skipping");
            skipped += 1;
            continue;
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %name, error = %e, "Could not read file; skipping");
                skipped += 1;
                continue;
            }
        };
        let Some(parsed) = parse_document(&text) else {
            warn!(file = %name, "No frontmatter header; skipping");
            skipped += 1;
            continue;
        };

        let metadata = parsed
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        debug!(file = %name, %id, "Parsed document");
        docs.push(ArticleDoc {
            id: id.to_string(),
            metadata,
            body: parsed.body,
        });
    }

    (docs, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_documents_filters_and_parses() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("2025-05-06_1f2e3d4c5b6a7988_Story.md"),
            "---\nsource: Verite News\ntitle: Story\n---\n\nBody text.\n",
        )
        .unwrap();
        fs::write(tmp.path().join("README.md"), "no frontmatter").unwrap();
        fs::write(tmp.path().join("notes.txt"), "not markdown").unwrap();
        fs::write(
            tmp.path().join("2025-05-07_badid_Other.md"),
            "---\ntitle: Other\n---\n\nMore text.\n",
        )
        .unwrap();

        let (docs, skipped) = collect_documents(&tmp.path().to_string_lossy());

        assert_eq!(docs.len(), 1);
        assert_eq!(skipped, 2);
        assert_eq!(docs[0].id, "1f2e3d4c5b6a7988");
        assert_eq!(docs[0].body, "Body text.");
        assert_eq!(
            docs[0].metadata.get("source"),
            Some(&Value::String("Verite News".to_string()))
        );
    }

    #[test]
    fn test_collect_documents_missing_dir_yields_nothing() {
        let (docs, skipped) = collect_documents("definitely/not/a/real/dir");
        assert!(docs.is_empty());
        assert_eq!(skipped, 0);
    }
}
