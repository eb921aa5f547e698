//! Article identity and the remote dedupe ledger.
//!
//! Every article is identified by the first 16 hex characters of the
//! SHA-256 of its URL string. The ledger is a single `articles.json`
//! file in the remote folder holding every record ever persisted; its
//! ids are the crawl's memory of what has been seen. Only saved
//! articles enter the ledger, so items that were skipped as irrelevant
//! or that failed mid-run are reconsidered on the next crawl.
//!
//! The ledger is read once at startup and written back once at the end
//! of a run, as a full pretty-printed replacement. A crash mid-run
//! loses at most the bookkeeping for that run's new files; the files
//! themselves are already uploaded and the next run re-covers them by
//! name.

use crate::error::{Error, Result};
use crate::models::ArticleRecord;
use crate::store::BoxSession;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Filename of the ledger in the remote folder.
pub const LEDGER_FILE: &str = "articles.json";

/// Derive the stable id for an article URL.
///
/// The id is the lowercase hex SHA-256 of the URL, truncated to 16
/// characters. The same URL always yields the same id, across runs and
/// across machines.
///
/// # Examples
///
/// ```ignore
/// let id = identify("https://example.com/story");
/// assert_eq!(id.len(), 16);
/// ```
pub fn identify(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

/// Collect the ids of every record in the ledger.
pub fn seen_ids(records: &[ArticleRecord]) -> HashSet<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

/// Whether an id has not been archived yet.
pub fn is_new(id: &str, seen: &HashSet<String>) -> bool {
    !seen.contains(id)
}

/// Fetch the ledger from the remote folder.
///
/// When no `articles.json` exists yet an empty one is created remotely
/// and an empty list is returned, so the first crawl starts from a
/// well-formed ledger.
#[instrument(level = "info", skip_all)]
pub async fn load(session: &BoxSession) -> Result<Vec<ArticleRecord>> {
    match session.find_file(LEDGER_FILE).await.map_err(|e| Error::ledger("load", e))? {
        Some(item) => {
            let bytes = session
                .download_file(&item.id)
                .await
                .map_err(|e| Error::ledger("load", e))?;
            let records: Vec<ArticleRecord> =
                serde_json::from_slice(&bytes).map_err(|e| Error::ledger("parse", e))?;
            info!(count = records.len(), "Loaded article ledger");
            Ok(records)
        }
        None => {
            session
                .upload_file(LEDGER_FILE, b"[]")
                .await
                .map_err(|e| Error::ledger("initialize", e))?;
            info!("No ledger found; created an empty one");
            Ok(Vec::new())
        }
    }
}

/// Append this run's records to the ledger and write it back.
///
/// The existing records keep their order; new records are appended in
/// the order they were saved.
#[instrument(level = "info", skip_all, fields(new = new_records.len()))]
pub async fn merge_and_persist(
    session: &BoxSession,
    mut records: Vec<ArticleRecord>,
    new_records: Vec<ArticleRecord>,
) -> Result<usize> {
    records.extend(new_records);
    let body = serde_json::to_string_pretty(&records).map_err(|e| Error::ledger("encode", e))?;
    session
        .upload_file(LEDGER_FILE, body.as_bytes())
        .await
        .map_err(|e| Error::ledger("save", e))?;
    info!(total = records.len(), "Persisted article ledger");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::auth::{BoxAuthenticator, Credentials};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_identify_is_deterministic() {
        let a = identify("https://example.com/story");
        let b = identify("https://example.com/story");
        assert_eq!(a, b);
    }

    #[test]
    fn test_identify_is_16_lowercase_hex() {
        let id = identify("https://thelensnola.org/2024/05/01/some-story/");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_identify_distinguishes_urls() {
        let a = identify("https://example.com/story");
        let b = identify("https://example.com/story/");
        let c = identify("https://example.com/other");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_identify_has_no_collisions_over_many_urls() {
        let ids: HashSet<String> = (0..10_000)
            .map(|n| identify(&format!("https://veritenews.org/2025/05/{n}/story-{n}/")))
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_seen_ids_collects_all() {
        let records = vec![sample_record("aaa"), sample_record("bbb")];
        let seen = seen_ids(&records);
        assert!(seen.contains("aaa"));
        assert!(seen.contains("bbb"));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_is_new_against_seen_set() {
        let seen = seen_ids(&[sample_record("aaa")]);
        assert!(!is_new("aaa", &seen));
        assert!(is_new("bbb", &seen));
    }

    fn sample_record(id: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            source: "Verite News".to_string(),
            url: "https://example.com".to_string(),
            title: "Title".to_string(),
            published: "2024-05-01T00:00:00+00:00".to_string(),
            saved_at: "2024-05-02T00:00:00+00:00".to_string(),
            content_preview: "Preview...".to_string(),
        }
    }

    fn test_session(server: &MockServer) -> BoxSession {
        let http = reqwest::Client::new();
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            access_token: "token-1".to_string(),
            refresh_token: "refresh-1".to_string(),
        };
        let auth = BoxAuthenticator::new(http.clone(), creds)
            .with_token_url(format!("{}/oauth2/token", server.uri()))
            .with_env_file(None);
        BoxSession::new(http, auth, "0").with_bases(server.uri(), server.uri())
    }

    #[tokio::test]
    async fn test_load_missing_ledger_creates_empty_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/folders/0/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 0,
                "entries": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files/content"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "entries": [{ "type": "file", "id": "50", "name": "articles.json" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = load(&test_session(&server)).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_load_existing_ledger() {
        let server = MockServer::start().await;
        let ledger = serde_json::to_string(&vec![sample_record("cafebabe00000000")]).unwrap();
        Mock::given(method("GET"))
            .and(path("/folders/0/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 1,
                "entries": [{ "type": "file", "id": "51", "name": "articles.json" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/51/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ledger))
            .mount(&server)
            .await;

        let records = load(&test_session(&server)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "cafebabe00000000");
    }

    #[tokio::test]
    async fn test_merge_and_persist_appends_and_uploads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/folders/0/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 1,
                "entries": [{ "type": "file", "id": "52", "name": "articles.json" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files/52/content"))
            .and(body_string_contains("old-id"))
            .and(body_string_contains("new-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "entries": [{ "type": "file", "id": "52", "name": "articles.json" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let total = merge_and_persist(
            &test_session(&server),
            vec![sample_record("old-id")],
            vec![sample_record("new-id")],
        )
        .await
        .unwrap();
        assert_eq!(total, 2);

        let upload = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.method.as_str() == "POST")
            .map(|r| String::from_utf8_lossy(&r.body).to_string())
            .unwrap();
        assert!(
            upload.find("old-id").unwrap() < upload.find("new-id").unwrap(),
            "existing records keep their position; new ones append"
        );
    }
}
