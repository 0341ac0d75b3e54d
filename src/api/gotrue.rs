//! Implements the `Identity` trait against a GoTrue (Supabase Auth) REST API.
//!
//! The session is persisted in `session.json` between invocations and refreshed with its refresh
//! token once it expires.

use crate::api::{Credentials, Identity, SessionStore};
use crate::error::IdentityError;
use crate::model::Session;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

type IdResult<T> = std::result::Result<T, IdentityError>;

pub(super) struct GoTrueIdentity {
    client: Client,
    auth_url: Url,
    anon_key: String,
    store: SessionStore,
}

impl GoTrueIdentity {
    pub(super) fn new(
        auth_url: &str,
        anon_key: &str,
        timeout: Option<std::time::Duration>,
        store: SessionStore,
    ) -> Result<Self> {
        let auth_url = Url::parse(auth_url)
            .with_context(|| format!("Invalid identity provider URL '{auth_url}'"))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            auth_url,
            anon_key: anon_key.to_string(),
            store,
        })
    }

    /// Builds `{auth_url}/auth/v1/{endpoint}` with the given query parameters.
    fn endpoint(&self, endpoint: &str, query: &[(&str, &str)]) -> IdResult<Url> {
        let base = self.auth_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/auth/v1/{endpoint}"))
            .context("Unable to build the identity provider URL")?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Exchanges a token grant for a session and stores it.
    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> IdResult<Session> {
        let url = self.endpoint("token", &[("grant_type", grant_type)])?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .context("Unable to reach the identity provider")?;
        let response = check(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .context("Unable to parse the identity provider's token response")?;
        let session = token.into_session(Utc::now());
        self.store.save(&session).await?;
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> IdResult<Session> {
        debug!("Refreshing the expired session");
        self.grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }
}

#[async_trait::async_trait]
impl Identity for GoTrueIdentity {
    async fn sign_up(&self, credentials: &Credentials, email_redirect_to: &str) -> IdResult<()> {
        let url = self.endpoint("signup", &[("redirect_to", email_redirect_to)])?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": credentials.email(),
                "password": credentials.password(),
            }))
            .send()
            .await
            .context("Unable to reach the identity provider")?;
        let _ = check(response).await?;
        info!("Account created for {}", credentials.email());
        Ok(())
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> IdResult<Session> {
        self.grant(
            "password",
            json!({
                "email": credentials.email(),
                "password": credentials.password(),
            }),
        )
        .await
    }

    async fn sign_out(&self) -> IdResult<()> {
        let saved = match self.store.load().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Discarding an unreadable saved session: {e:#}");
                None
            }
        };
        if let Some(session) = saved {
            let url = self.endpoint("logout", &[])?;
            let result = self
                .client
                .post(url)
                .header("apikey", &self.anon_key)
                .bearer_auth(session.access_token())
                .send()
                .await;
            // The local session goes away whatever the provider says.
            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!("The identity provider rejected sign out: {}", response.status())
                }
                Err(e) => warn!("Unable to reach the identity provider to sign out: {e}"),
                Ok(_) => {}
            }
        }
        self.store.clear().await?;
        Ok(())
    }

    async fn get_session(&self) -> IdResult<Option<Session>> {
        let Some(session) = self.store.load().await? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token() else {
            debug!("Session expired and there is no refresh token");
            self.store.clear().await?;
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(IdentityError::Provider { message }) => {
                warn!("Session refresh was rejected: {message}");
                self.store.clear().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Turns a non-success response into `IdentityError::Provider` with the provider's own message.
async fn check(response: Response) -> IdResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    Err(IdentityError::provider(provider_message(&body).unwrap_or_else(
        || format!("identity provider responded with status {status}"),
    )))
}

/// GoTrue has used several error shapes over the years; take whichever message field is present.
fn provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue's default access token lifetime.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| {
                now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
            });
        Session::new(
            self.access_token,
            self.refresh_token,
            expires_at,
            self.user.and_then(|u| u.email),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity(dir: &TempDir) -> GoTrueIdentity {
        GoTrueIdentity::new(
            "https://project.supabase.co/",
            "anon",
            None,
            SessionStore::new(dir.path().join("session.json")),
        )
        .unwrap()
    }

    #[test]
    fn test_provider_message_shapes() {
        assert_eq!(
            provider_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            provider_message(r#"{"code":422,"msg":"User already registered"}"#),
            Some("User already registered".to_string())
        );
        assert_eq!(
            provider_message(r#"{"message":"Email not confirmed"}"#),
            Some("Email not confirmed".to_string())
        );
        assert_eq!(provider_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_endpoint_with_query() {
        let dir = TempDir::new().unwrap();
        let url = identity(&dir)
            .endpoint("token", &[("grant_type", "password")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_endpoint_encodes_redirect() {
        let dir = TempDir::new().unwrap();
        let url = identity(&dir)
            .endpoint(
                "signup",
                &[("redirect_to", "http://localhost:3000/auth/callback")],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/auth/v1/signup?redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"
        );
    }

    #[test]
    fn test_token_response_with_expires_at() {
        let json = r#"{
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1893456000,
            "refresh_token": "rt",
            "user": { "id": "u1", "email": "me@example.com" }
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let session = token.into_session(Utc::now());
        assert_eq!(session.access_token(), "at");
        assert_eq!(session.refresh_token(), Some("rt"));
        assert_eq!(session.expires_at().timestamp(), 1893456000);
        assert_eq!(session.user_email(), Some("me@example.com"));
    }

    #[test]
    fn test_token_response_with_expires_in_only() {
        let now = Utc::now();
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "at", "expires_in": 600}"#).unwrap();
        let session = token.into_session(now);
        assert_eq!(session.expires_at(), now + Duration::seconds(600));
        assert_eq!(session.refresh_token(), None);
    }

    #[tokio::test]
    async fn test_get_session_without_file() {
        let dir = TempDir::new().unwrap();
        assert!(identity(&dir).get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_session_valid_file_needs_no_network() {
        let dir = TempDir::new().unwrap();
        let id = identity(&dir);
        let session = Session::new("at", None, Utc::now() + Duration::hours(1), None);
        id.store.save(&session).await.unwrap();
        assert_eq!(id.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_is_cleared() {
        let dir = TempDir::new().unwrap();
        let id = identity(&dir);
        let session = Session::new("at", None, Utc::now() - Duration::hours(1), None);
        id.store.save(&session).await.unwrap();
        assert!(id.get_session().await.unwrap().is_none());
        assert!(!id.store.path().exists());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_needs_no_network() {
        let dir = TempDir::new().unwrap();
        identity(&dir).sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn test_sign_out_removes_corrupt_session_file() {
        let dir = TempDir::new().unwrap();
        let id = identity(&dir);
        std::fs::write(id.store.path(), "{not json").unwrap();
        assert!(id.get_session().await.is_err());

        id.sign_out().await.unwrap();
        assert!(!id.store.path().exists());
        assert!(id.get_session().await.unwrap().is_none());
    }
}
