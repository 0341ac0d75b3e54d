//! The two remote collaborators, behind traits so that the views never know whether they are
//! talking to the real services or to the in-memory fakes:
//!
//! - `Identity`: the identity provider that owns sign-up, sign-in and the current session.
//! - `Backend`: the expenses backend, reached with bearer-authenticated JSON requests.
//!
//! All backend calls go through `get_json`/`post_json`, which attach the session's bearer token
//! and hand back a `Fetched<T>` rather than raising.

mod files;
mod gotrue;
mod http;
mod test_client;

use crate::error::IdentityError;
use crate::model::Session;
use crate::{Config, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

pub(crate) use files::SessionStore;
pub use test_client::{
    IdentityCall, RecordedRequest, TestBackend, TestIdentity, DEMO_EMAIL, DEMO_PASSWORD,
};

/// Aggregate statistics for the dashboard.
pub const DASHBOARD: &str = "/api/expenses/dashboard";
/// Transactions the backend has marked for review.
pub const FLAGGED: &str = "/api/expenses/flagged";
/// Every transaction.
pub const EXPENSES: &str = "/api/expenses";
/// Receipt upload and processing.
pub const PROCESS_RECEIPT: &str = "/api/process-receipt";

/// When `TAXMAN_IN_TEST_MODE` is set to a non-empty value, the in-memory fakes are used instead
/// of the network.
pub const TEST_MODE_ENV: &str = "TAXMAN_IN_TEST_MODE";

/// Selects the implementations of `Identity` and `Backend`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Talk to the configured identity provider and backend over HTTP.
    #[default]
    Http,
    /// Use in-memory fakes seeded with sample data.
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Email and password as typed by the user.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The identity provider. Every view is handed one of these explicitly.
#[async_trait::async_trait]
pub trait Identity: Send + Sync {
    /// Registers a new account. `email_redirect_to` is where the verification link points.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        email_redirect_to: &str,
    ) -> std::result::Result<(), IdentityError>;

    /// Creates a session for an existing account and makes it the current session.
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Session, IdentityError>;

    /// Ends the current session.
    async fn sign_out(&self) -> std::result::Result<(), IdentityError>;

    /// Returns the current session, or `None` when the user is not authenticated.
    async fn get_session(&self) -> std::result::Result<Option<Session>, IdentityError>;
}

/// Raw JSON transport to the expenses backend. Implementations never raise: every failure is
/// reported as `Fetched::Failed`.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, path: &str, token: &str) -> Fetched<Value>;

    async fn post(&self, path: &str, token: &str, body: &Value) -> Fetched<Value>;
}

/// The outcome of one backend request: either the decoded payload or the reason it failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Ok(T),
    Failed(FetchFailure),
}

impl<T> Fetched<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Fetched::Ok(_))
    }

    /// Discards the failure reason.
    pub fn ok(self) -> Option<T> {
        match self {
            Fetched::Ok(value) => Some(value),
            Fetched::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Fetched::Ok(_) => None,
            Fetched::Failed(failure) => Some(failure),
        }
    }
}

/// Why a backend request did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    /// There was no session to take a bearer token from.
    #[error("no active session")]
    Unauthenticated,

    /// The server answered with a non-success status. `body` is kept because the backend
    /// sometimes explains the failure in it.
    #[error("server responded with status {status}")]
    Status { status: u16, body: String },

    /// The request never got an answer.
    #[error("request failed: {0}")]
    Transport(String),

    /// The answer was not the JSON we expected.
    #[error("unable to decode response: {0}")]
    Decode(String),
}

/// Issues an authenticated GET and decodes the JSON response into `T`.
pub async fn get_json<T>(backend: &dyn Backend, session: &Session, path: &str) -> Fetched<T>
where
    T: DeserializeOwned,
{
    debug!("GET {path}");
    decode(backend.get(path, session.access_token()).await)
}

/// Issues an authenticated POST with a JSON `body` and decodes the JSON response into `T`.
pub async fn post_json<T, B>(
    backend: &dyn Backend,
    session: &Session,
    path: &str,
    body: &B,
) -> Fetched<T>
where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
{
    debug!("POST {path}");
    let body = match serde_json::to_value(body) {
        Ok(body) => body,
        Err(e) => return Fetched::Failed(FetchFailure::Decode(e.to_string())),
    };
    decode(backend.post(path, session.access_token(), &body).await)
}

fn decode<T>(fetched: Fetched<Value>) -> Fetched<T>
where
    T: DeserializeOwned,
{
    match fetched {
        Fetched::Ok(value) => match serde_json::from_value(value) {
            Ok(decoded) => Fetched::Ok(decoded),
            Err(e) => Fetched::Failed(FetchFailure::Decode(e.to_string())),
        },
        Fetched::Failed(failure) => Fetched::Failed(failure),
    }
}

/// Creates the identity provider for `mode`.
pub async fn identity(config: &Config, mode: Mode) -> Result<Arc<dyn Identity>> {
    let store = SessionStore::new(config.session_path());
    Ok(match mode {
        Mode::Http => Arc::new(gotrue::GoTrueIdentity::new(
            config.auth_url(),
            config.anon_key(),
            config.request_timeout(),
            store,
        )?),
        Mode::Test => Arc::new(TestIdentity::persisted(store).await?),
    })
}

/// Creates the expenses backend client for `mode`.
pub fn backend(config: &Config, mode: Mode) -> Result<Arc<dyn Backend>> {
    Ok(match mode {
        Mode::Http => Arc::new(http::HttpBackend::new(
            config.api_url(),
            config.request_timeout(),
        )?),
        Mode::Test => Arc::new(TestBackend::default()),
    })
}
