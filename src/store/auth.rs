//! OAuth2 session management for the remote store.
//!
//! The authenticator owns the access/refresh token pair and exposes a
//! single [`BoxAuthenticator::current_token`] accessor; nothing else in the
//! crate touches refresh mechanics. Box rotates the refresh token on every
//! refresh, so rotated pairs are written back to the local `.env` file.
//! Losing a rotated refresh token locks the account out until the OAuth
//! bootstrap is repeated.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

const DEFAULT_TOKEN_URL: &str = "https://api.box.com/oauth2/token";

/// OAuth2 credentials pulled from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// May be empty when only a refresh token is configured.
    pub access_token: String,
    /// May be empty when only an access token is configured.
    pub refresh_token: String,
}

impl Credentials {
    /// Read credentials from `BOX_*` environment variables.
    ///
    /// The client id and secret are required, as is at least one of the
    /// two tokens. Fails fast so a misconfigured run dies before any
    /// network activity.
    pub fn from_env() -> Result<Self> {
        let client_id = require_env("BOX_CLIENT_ID")?;
        let client_secret = require_env("BOX_CLIENT_SECRET")?;
        let access_token = std::env::var("BOX_ACCESS_TOKEN").unwrap_or_default();
        let refresh_token = std::env::var("BOX_REFRESH_TOKEN").unwrap_or_default();

        if access_token.is_empty() && refresh_token.is_empty() {
            return Err(Error::Config(
                "BOX_ACCESS_TOKEN or BOX_REFRESH_TOKEN".to_string(),
            ));
        }

        Ok(Self {
            client_id,
            client_secret,
            access_token,
            refresh_token,
        })
    }
}

fn require_env(name: &'static str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(Error::Config(name.to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug)]
struct TokenPair {
    access: String,
    refresh: String,
}

/// Holds the token pair and refreshes it against the OAuth token endpoint.
pub struct BoxAuthenticator {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    tokens: Mutex<TokenPair>,
    env_file: Option<PathBuf>,
}

impl BoxAuthenticator {
    pub fn new(http: reqwest::Client, creds: Credentials) -> Self {
        Self {
            http,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: creds.client_id,
            client_secret: creds.client_secret,
            tokens: Mutex::new(TokenPair {
                access: creds.access_token,
                refresh: creds.refresh_token,
            }),
            env_file: Some(PathBuf::from(".env")),
        }
    }

    /// Point the authenticator at a different token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Where rotated token pairs are persisted; `None` disables persistence.
    pub fn with_env_file(mut self, path: Option<PathBuf>) -> Self {
        self.env_file = path;
        self
    }

    /// Eagerly refresh the pair at startup when a refresh token exists.
    ///
    /// A failure here is survivable: the run continues on the existing
    /// access token, which may still be valid.
    #[instrument(level = "info", skip_all)]
    pub async fn refresh_on_startup(&self) {
        let has_refresh = { !self.tokens.lock().await.refresh.is_empty() };
        if !has_refresh {
            return;
        }
        match self.refresh().await {
            Ok(()) => info!("Access token refreshed"),
            Err(e) => {
                warn!(error = %e, "Token refresh failed; using existing access token")
            }
        }
    }

    /// The access token store requests should authenticate with.
    ///
    /// Refreshes first if no access token is held yet (refresh-token-only
    /// configurations).
    pub async fn current_token(&self) -> Result<String> {
        let empty = { self.tokens.lock().await.access.is_empty() };
        if empty {
            self.refresh().await?;
        }
        let tokens = self.tokens.lock().await;
        if tokens.access.is_empty() {
            return Err(Error::Auth("no access token available".to_string()));
        }
        Ok(tokens.access.clone())
    }

    /// Refresh after the store answered 401, returning the new token.
    pub async fn refresh_after_unauthorized(&self) -> Result<String> {
        self.refresh().await?;
        Ok(self.tokens.lock().await.access.clone())
    }

    /// Exchange the refresh token for a new pair and persist the rotation.
    async fn refresh(&self) -> Result<()> {
        let refresh_token = {
            let tokens = self.tokens.lock().await;
            if tokens.refresh.is_empty() {
                return Err(Error::Auth("no refresh token configured".to_string()));
            }
            tokens.refresh.clone()
        };

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let rotated: TokenResponse = resp.json().await.map_err(|e| Error::Auth(e.to_string()))?;

        {
            let mut tokens = self.tokens.lock().await;
            tokens.access = rotated.access_token.clone();
            tokens.refresh = rotated.refresh_token.clone();
        }

        if let Some(path) = &self.env_file {
            if let Err(e) = persist_tokens(path, &rotated.access_token, &rotated.refresh_token) {
                warn!(error = %e, path = %path.display(), "Failed to persist rotated tokens");
            }
        }

        Ok(())
    }
}

/// Rewrite the `BOX_ACCESS_TOKEN`/`BOX_REFRESH_TOKEN` lines of the env
/// file, preserving everything else. Creates the file when absent.
fn persist_tokens(path: &Path, access: &str, refresh: &str) -> std::io::Result<()> {
    let mut lines: Vec<String> = match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .filter(|line| {
                !line.starts_with("BOX_ACCESS_TOKEN") && !line.starts_with("BOX_REFRESH_TOKEN")
            })
            .map(str::to_string)
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };

    lines.push(format!("BOX_ACCESS_TOKEN={access}"));
    lines.push(format!("BOX_REFRESH_TOKEN={refresh}"));
    std::fs::write(path, lines.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(access: &str, refresh: &str) -> Credentials {
        Credentials {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    fn token_body(access: &str, refresh: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer",
            "expires_in": 4151
        })
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("client_id=client-id"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_body("new-access", "new-refresh")),
            )
            .mount(&server)
            .await;

        let auth = BoxAuthenticator::new(reqwest::Client::new(), creds("", "old-refresh"))
            .with_token_url(format!("{}/oauth2/token", server.uri()))
            .with_env_file(None);

        let token = auth.current_token().await.unwrap();
        assert_eq!(token, "new-access");
    }

    #[tokio::test]
    async fn test_startup_refresh_failure_keeps_existing_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let auth = BoxAuthenticator::new(reqwest::Client::new(), creds("still-good", "stale"))
            .with_token_url(format!("{}/oauth2/token", server.uri()))
            .with_env_file(None);

        auth.refresh_on_startup().await;
        assert_eq!(auth.current_token().await.unwrap(), "still-good");
    }

    #[tokio::test]
    async fn test_refresh_failure_without_access_token_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let auth = BoxAuthenticator::new(reqwest::Client::new(), creds("", "bad"))
            .with_token_url(format!("{}/oauth2/token", server.uri()))
            .with_env_file(None);

        assert!(auth.current_token().await.is_err());
    }

    #[tokio::test]
    async fn test_rotated_tokens_persisted_to_env_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_body("rotated-a", "rotated-r")),
            )
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let env_path = tmp.path().join(".env");
        std::fs::write(
            &env_path,
            "BOX_CLIENT_ID=client-id\nBOX_ACCESS_TOKEN=old\nBOX_REFRESH_TOKEN=older\n",
        )
        .unwrap();

        let auth = BoxAuthenticator::new(reqwest::Client::new(), creds("", "older"))
            .with_token_url(format!("{}/oauth2/token", server.uri()))
            .with_env_file(Some(env_path.clone()));

        auth.current_token().await.unwrap();

        let written = std::fs::read_to_string(&env_path).unwrap();
        assert!(written.contains("BOX_CLIENT_ID=client-id"));
        assert!(written.contains("BOX_ACCESS_TOKEN=rotated-a"));
        assert!(written.contains("BOX_REFRESH_TOKEN=rotated-r"));
        assert!(!written.contains("BOX_ACCESS_TOKEN=old\n"));
    }

    #[test]
    fn test_persist_tokens_creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let env_path = tmp.path().join(".env");

        persist_tokens(&env_path, "a", "r").unwrap();

        let written = std::fs::read_to_string(&env_path).unwrap();
        assert_eq!(written, "BOX_ACCESS_TOKEN=a\nBOX_REFRESH_TOKEN=r\n");
    }
}
