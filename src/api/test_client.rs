//! In-memory implementations of `Identity` and `Backend`.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without an identity provider or expenses backend (see `Mode::Test`). Both
//! fakes record every call they receive so tests can assert on what was, or was not, requested.

use crate::api::{
    Backend, Credentials, FetchFailure, Fetched, Identity, SessionStore, DASHBOARD, EXPENSES,
    FLAGGED, PROCESS_RECEIPT,
};
use crate::error::IdentityError;
use crate::model::{Session, HIGH_RISK};
use crate::Result;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;
use uuid::Uuid;

type IdResult<T> = std::result::Result<T, IdentityError>;

/// The account that exists in a fresh `TestIdentity`.
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "demo-password";

/// A call received by `TestIdentity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCall {
    SignUp { email: String, redirect_to: String },
    SignIn { email: String },
    SignOut,
    GetSession,
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<String, String>,
    unverified: HashSet<String>,
    session: Option<Session>,
    calls: Vec<IdentityCall>,
    fail_next_sign_in: Option<IdentityError>,
    fail_next_sign_up: Option<IdentityError>,
    fail_get_session: bool,
}

/// An identity provider that keeps accounts and the current session in memory.
pub struct TestIdentity {
    state: Mutex<IdentityState>,
    require_verification: bool,
    store: Option<SessionStore>,
}

impl Default for TestIdentity {
    /// A provider with the demo account and nobody signed in.
    fn default() -> Self {
        let mut state = IdentityState::default();
        state
            .accounts
            .insert(DEMO_EMAIL.to_string(), DEMO_PASSWORD.to_string());
        Self {
            state: Mutex::new(state),
            require_verification: false,
            store: None,
        }
    }
}

impl TestIdentity {
    /// A provider whose demo account is already signed in.
    pub fn signed_in() -> Self {
        let identity = Self::default();
        identity.lock().session = Some(demo_session(DEMO_EMAIL));
        identity
    }

    /// A provider whose session survives between processes by living in `store`, which is what
    /// the CLI uses in test mode.
    /// An unreadable session file counts as nobody being signed in, so that signing out can
    /// still remove it.
    pub(crate) async fn persisted(store: SessionStore) -> Result<Self> {
        let session = match store.load().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding an unreadable saved session: {e:#}");
                None
            }
        };
        let identity = Self {
            store: Some(store),
            ..Self::default()
        };
        identity.lock().session = session;
        Ok(identity)
    }

    /// Accounts created by `sign_up` cannot sign in until verified, which they never are.
    pub fn require_verification(mut self) -> Self {
        self.require_verification = true;
        self
    }

    /// The next `sign_in_with_password` fails with `error`.
    pub fn fail_next_sign_in(&self, error: IdentityError) {
        self.lock().fail_next_sign_in = Some(error);
    }

    /// The next `sign_up` fails with `error`.
    pub fn fail_next_sign_up(&self, error: IdentityError) {
        self.lock().fail_next_sign_up = Some(error);
    }

    /// Every `get_session` fails unexpectedly.
    pub fn fail_get_session(&self) {
        self.lock().fail_get_session = true;
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<IdentityCall> {
        self.lock().calls.clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    fn lock(&self) -> MutexGuard<'_, IdentityState> {
        // A poisoned lock only means another test thread panicked; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn persist(&self, session: Option<&Session>) -> IdResult<()> {
        if let Some(store) = &self.store {
            match session {
                Some(session) => store.save(session).await?,
                None => store.clear().await?,
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Identity for TestIdentity {
    async fn sign_up(&self, credentials: &Credentials, email_redirect_to: &str) -> IdResult<()> {
        let mut state = self.lock();
        state.calls.push(IdentityCall::SignUp {
            email: credentials.email().to_string(),
            redirect_to: email_redirect_to.to_string(),
        });
        if let Some(error) = state.fail_next_sign_up.take() {
            return Err(error);
        }
        if state.accounts.contains_key(credentials.email()) {
            return Err(IdentityError::provider("User already registered"));
        }
        state.accounts.insert(
            credentials.email().to_string(),
            credentials.password().to_string(),
        );
        if self.require_verification {
            state.unverified.insert(credentials.email().to_string());
        }
        Ok(())
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> IdResult<Session> {
        let session = {
            let mut state = self.lock();
            state.calls.push(IdentityCall::SignIn {
                email: credentials.email().to_string(),
            });
            if let Some(error) = state.fail_next_sign_in.take() {
                return Err(error);
            }
            match state.accounts.get(credentials.email()) {
                Some(password) if password == credentials.password() => {}
                _ => return Err(IdentityError::provider("Invalid login credentials")),
            }
            if state.unverified.contains(credentials.email()) {
                return Err(IdentityError::provider("Email not confirmed"));
            }
            let session = demo_session(credentials.email());
            state.session = Some(session.clone());
            session
        };
        self.persist(Some(&session)).await?;
        Ok(session)
    }

    async fn sign_out(&self) -> IdResult<()> {
        {
            let mut state = self.lock();
            state.calls.push(IdentityCall::SignOut);
            state.session = None;
        }
        self.persist(None).await
    }

    async fn get_session(&self) -> IdResult<Option<Session>> {
        let mut state = self.lock();
        state.calls.push(IdentityCall::GetSession);
        if state.fail_get_session {
            return Err(IdentityError::Unexpected(anyhow::anyhow!(
                "session storage is unavailable"
            )));
        }
        Ok(state.session.clone())
    }
}

fn demo_session(email: &str) -> Session {
    Session::new(
        format!("test-token-{}", Uuid::new_v4().simple()),
        Some(format!("test-refresh-{}", Uuid::new_v4().simple())),
        Utc::now() + Duration::hours(1),
        Some(email.to_string()),
    )
}

/// A request received by `TestBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub token: String,
    pub body: Option<Value>,
}

struct BackendState {
    responses: HashMap<String, Fetched<Value>>,
    requests: Vec<RecordedRequest>,
}

/// An expenses backend holding its responses in memory. By default it is seeded with a handful
/// of transactions, and processing a receipt succeeds and adds a transaction.
pub struct TestBackend {
    state: Mutex<BackendState>,
}

impl Default for TestBackend {
    fn default() -> Self {
        let mut responses = HashMap::new();
        responses.insert(EXPENSES.to_string(), Fetched::Ok(seed_transactions()));
        responses.insert(DASHBOARD.to_string(), Fetched::Ok(seed_stats()));
        responses.insert(FLAGGED.to_string(), Fetched::Ok(seed_flagged()));
        responses.insert(
            PROCESS_RECEIPT.to_string(),
            Fetched::Ok(json!({ "success": true })),
        );
        Self {
            state: Mutex::new(BackendState {
                responses,
                requests: Vec::new(),
            }),
        }
    }
}

impl TestBackend {
    /// A backend with no data at all: no stats, no transactions.
    pub fn empty() -> Self {
        let backend = Self::default();
        backend.respond(EXPENSES, json!([]));
        backend.respond(FLAGGED, json!([]));
        backend.respond(DASHBOARD, Value::Null);
        backend
    }

    /// Requests to `path` succeed with `value`.
    pub fn respond(&self, path: &str, value: Value) {
        self.lock()
            .responses
            .insert(path.to_string(), Fetched::Ok(value));
    }

    /// Requests to `path` fail with `failure`.
    pub fn fail(&self, path: &str, failure: FetchFailure) {
        self.lock()
            .responses
            .insert(path.to_string(), Fetched::Failed(failure));
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn response(state: &BackendState, path: &str) -> Fetched<Value> {
        state.responses.get(path).cloned().unwrap_or_else(|| {
            Fetched::Failed(FetchFailure::Status {
                status: 404,
                body: json!({ "error": "Not found" }).to_string(),
            })
        })
    }
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn get(&self, path: &str, token: &str) -> Fetched<Value> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            token: token.to_string(),
            body: None,
        });
        Self::response(&state, path)
    }

    async fn post(&self, path: &str, token: &str, body: &Value) -> Fetched<Value> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            token: token.to_string(),
            body: Some(body.clone()),
        });
        let response = Self::response(&state, path);

        // A successful receipt shows up in the transaction list, like the real backend.
        let succeeded = matches!(&response, Fetched::Ok(v) if v["success"] == json!(true));
        if path == PROCESS_RECEIPT && succeeded {
            if let Some(Fetched::Ok(Value::Array(rows))) = state.responses.get_mut(EXPENSES) {
                rows.insert(0, processed_receipt());
            }
        }
        response
    }
}

fn processed_receipt() -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "date": Utc::now().format("%Y-%m-%d").to_string(),
        "merchant": "Scanned Receipt",
        "category": "Uncategorized",
        "total_amount_numeric": 0,
        "leakage_risk_score": 0,
        "tax_deductible": false
    })
}

fn seed_transactions() -> Value {
    json!([
        {
            "id": 1,
            "date": "2025-10-20",
            "merchant": "Reliance Fresh",
            "category": "Groceries",
            "total_amount_numeric": 2450.75,
            "leakage_risk_score": 2,
            "tax_deductible": false
        },
        {
            "id": 2,
            "date": "2025-10-18",
            "merchant": "Indian Oil Petrol Pump",
            "category": "Fuel",
            "total_amount_numeric": 3200,
            "leakage_risk_score": 5,
            "tax_deductible": true
        },
        {
            "id": 3,
            "date": "2025-10-15",
            "merchant": "Sharma Electronics",
            "category": "Office Equipment",
            "total_amount_numeric": 58999,
            "leakage_risk_score": HIGH_RISK + 1,
            "tax_deductible": true
        },
        {
            "id": 4,
            "date": "2025-10-12",
            "merchant": "Cafe Coffee Day",
            "category": "Meals",
            "total_amount_numeric": 480.5,
            "leakage_risk_score": HIGH_RISK,
            "tax_deductible": false
        }
    ])
}

fn seed_flagged() -> Value {
    json!([
        {
            "id": 3,
            "date": "2025-10-15",
            "merchant": "Sharma Electronics",
            "category": "Office Equipment",
            "total_amount_numeric": 58999,
            "leakage_risk_score": HIGH_RISK + 1,
            "tax_deductible": true
        },
        {
            "id": 4,
            "date": "2025-10-12",
            "merchant": "Cafe Coffee Day",
            "category": "Meals",
            "total_amount_numeric": 480.5,
            "leakage_risk_score": HIGH_RISK,
            "tax_deductible": false
        }
    ])
}

fn seed_stats() -> Value {
    json!({
        "totalExpensesYTD": 65130.25,
        "totalGSTClaimed": 9876.5,
        "totalOtherTaxes": 1250,
        "riskScoreAverage": "5.50"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sign_in_demo_account() {
        let identity = TestIdentity::default();
        let session = identity
            .sign_in_with_password(&Credentials::new(DEMO_EMAIL, DEMO_PASSWORD))
            .await
            .unwrap();
        assert_eq!(session.user_email(), Some(DEMO_EMAIL));
        assert_eq!(identity.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let identity = TestIdentity::default();
        let err = identity
            .sign_in_with_password(&Credentials::new(DEMO_EMAIL, "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Provider { .. }));
        assert!(identity.current_session().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sign_up() {
        let identity = TestIdentity::default();
        let err = identity
            .sign_up(&Credentials::new(DEMO_EMAIL, "another"), "http://x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[tokio::test]
    async fn test_unverified_account_cannot_sign_in() {
        let identity = TestIdentity::default().require_verification();
        let credentials = Credentials::new("new@example.com", "secret1");
        identity.sign_up(&credentials, "http://x").await.unwrap();
        let err = identity
            .sign_in_with_password(&credentials)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email not confirmed");
    }

    #[tokio::test]
    async fn test_persisted_session_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");

        let first = TestIdentity::persisted(SessionStore::new(&path))
            .await
            .unwrap();
        let session = first
            .sign_in_with_password(&Credentials::new(DEMO_EMAIL, DEMO_PASSWORD))
            .await
            .unwrap();

        let second = TestIdentity::persisted(SessionStore::new(&path))
            .await
            .unwrap();
        assert_eq!(second.get_session().await.unwrap(), Some(session));

        second.sign_out().await.unwrap();
        let third = TestIdentity::persisted(SessionStore::new(&path))
            .await
            .unwrap();
        assert!(third.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persisted_survives_corrupt_session_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let identity = TestIdentity::persisted(SessionStore::new(&path))
            .await
            .unwrap();
        assert!(identity.get_session().await.unwrap().is_none());
        identity.sign_out().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_processed_receipt_is_listed() {
        let backend = TestBackend::default();
        let before = backend.get(EXPENSES, "t").await.ok().unwrap();
        let _ = backend
            .post(PROCESS_RECEIPT, "t", &json!({ "imageBase64": "AAAA" }))
            .await;
        let after = backend.get(EXPENSES, "t").await.ok().unwrap();
        assert_eq!(
            after.as_array().unwrap().len(),
            before.as_array().unwrap().len() + 1
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let backend = TestBackend::default();
        let fetched = backend.get("/api/nope", "t").await;
        assert!(matches!(
            fetched,
            Fetched::Failed(FetchFailure::Status { status: 404, .. })
        ));
    }
}
