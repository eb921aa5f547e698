//! Error types for the crawler and its collaborators.
//!
//! Failures fall into the buckets the pipeline cares about:
//! - Per-source: one feed failing to fetch or parse ([`Error::Feed`])
//! - Per-item: page rendering or document upload failing ([`Error::Render`],
//!   [`Error::StoreApi`])
//! - Fatal: ledger load/save ([`Error::Ledger`]), missing credentials
//!   ([`Error::Config`]), token refresh exhaustion ([`Error::Auth`])
//!
//! Whether an error aborts the run is decided at the call site: the driver
//! catches per-item errors and continues, while ledger and configuration
//! errors propagate to `main` and exit non-zero.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure modes surfaced by the crawler.
#[derive(Debug, Error)]
pub enum Error {
    /// An HTTP request failed at the transport level.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A local filesystem operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A feed source could not be fetched or parsed. Degrades to zero
    /// items from that source; never aborts the run.
    #[error("feed source {url} failed: {reason}")]
    Feed { url: String, reason: String },

    /// A page could not be rendered to HTML.
    #[error("failed to render {url}: {reason}")]
    Render { url: String, reason: String },

    /// The remote store answered with a non-success status.
    #[error("remote store {op} returned {status}: {body}")]
    StoreApi {
        op: &'static str,
        status: u16,
        body: String,
    },

    /// Loading or saving the article ledger failed.
    #[error("ledger {action} failed: {reason}")]
    Ledger {
        action: &'static str,
        reason: String,
    },

    /// OAuth token refresh failed.
    #[error("token refresh failed: {0}")]
    Auth(String),

    /// A required configuration value is absent or invalid.
    #[error("missing configuration: {0}")]
    Config(String),

    /// The vector index rejected an operation.
    #[error("vector index error: {0}")]
    VectorIndex(String),
}

impl Error {
    /// Wrap a ledger-phase failure with the action that was underway.
    pub fn ledger(action: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Ledger {
            action,
            reason: err.to_string(),
        }
    }

    /// Whether this error must abort the run instead of degrading to a
    /// skipped item or source. Ledger state, credentials, and token
    /// refresh have no per-item recovery; everything else does.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Ledger { .. } | Error::Config(_) | Error::Auth(_)
        )
    }
}
