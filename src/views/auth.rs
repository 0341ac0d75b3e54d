//! Sign-in and sign-up.

use crate::api::{Credentials, Identity};
use crate::error::IdentityError;
use crate::views::{Navigation, Route};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Passwords shorter than this are rejected before any request is made.
pub const MIN_PASSWORD_LEN: usize = 6;

const MISSING_FIELDS: &str = "Please enter both email and password";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
const CHECK_EMAIL: &str =
    "Check your email for verification link! You can sign in immediately for development.";
const AUTH_FAILED: &str = "Authentication failed. Please try again.";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

serde_plain::derive_display_from_serialize!(AuthMode);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Info,
    Error,
}

/// The single line of feedback shown above the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMessage {
    kind: MessageKind,
    text: String,
}

impl AuthMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

/// What a submission produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    message: Option<AuthMessage>,
    navigation: Option<Navigation>,
}

impl AuthOutcome {
    pub fn message(&self) -> Option<&AuthMessage> {
        self.message.as_ref()
    }

    pub fn navigation(&self) -> Option<Navigation> {
        self.navigation
    }
}

/// Checks the form before anything is sent. Returns the message to show when it is not valid.
pub fn validate(email: &str, password: &str) -> Result<(), &'static str> {
    if email.is_empty() || password.is_empty() {
        return Err(MISSING_FIELDS);
    }
    // Measured in UTF-16 code units, the way the browser form measures it.
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        return Err(PASSWORD_TOO_SHORT);
    }
    Ok(())
}

/// The authentication form.
pub struct AuthView {
    identity: Arc<dyn Identity>,
    email_redirect_to: String,
    auto_sign_in: bool,
    mode: AuthMode,
    loading: bool,
    message: Option<AuthMessage>,
}

impl AuthView {
    pub fn new(identity: Arc<dyn Identity>, email_redirect_to: impl Into<String>) -> Self {
        Self {
            identity,
            email_redirect_to: email_redirect_to.into(),
            auto_sign_in: true,
            mode: AuthMode::default(),
            loading: false,
            message: None,
        }
    }

    /// Whether a successful sign-up immediately signs in with the same credentials.
    pub fn auto_sign_in(mut self, enabled: bool) -> Self {
        self.auto_sign_in = enabled;
        self
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AuthMode) {
        if self.mode != mode {
            self.toggle_mode();
        }
    }

    /// Switches between sign-in and sign-up, clearing any message.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.message = None;
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn message(&self) -> Option<&AuthMessage> {
        self.message.as_ref()
    }

    /// Validates the form and, if it is valid, signs in or signs up depending on the mode.
    pub async fn submit(&mut self, email: &str, password: &str) -> AuthOutcome {
        if let Err(message) = validate(email, password) {
            self.message = Some(AuthMessage::error(message));
            return self.outcome(None);
        }

        self.loading = true;
        self.message = None;
        let credentials = Credentials::new(email, password);
        let navigation = match self.mode {
            AuthMode::SignUp => self.sign_up(&credentials).await,
            AuthMode::SignIn => self.sign_in(&credentials).await,
        };
        self.loading = false;
        self.outcome(navigation)
    }

    async fn sign_in(&mut self, credentials: &Credentials) -> Option<Navigation> {
        match self.identity.sign_in_with_password(credentials).await {
            Ok(_) => Some(Navigation::push(Route::Scan)),
            Err(IdentityError::Provider { message }) => {
                self.message = Some(AuthMessage::error(format!("Sign in error: {message}")));
                None
            }
            Err(IdentityError::Unexpected(e)) => {
                self.unexpected(e);
                None
            }
        }
    }

    async fn sign_up(&mut self, credentials: &Credentials) -> Option<Navigation> {
        match self
            .identity
            .sign_up(credentials, &self.email_redirect_to)
            .await
        {
            Ok(()) => {}
            Err(IdentityError::Provider { message }) => {
                self.message = Some(AuthMessage::error(format!("Sign up error: {message}")));
                return None;
            }
            Err(IdentityError::Unexpected(e)) => {
                self.unexpected(e);
                return None;
            }
        }

        self.message = Some(AuthMessage::info(CHECK_EMAIL));
        if !self.auto_sign_in {
            return None;
        }
        match self.identity.sign_in_with_password(credentials).await {
            Ok(_) => Some(Navigation::push(Route::Scan)),
            // The account exists but is not usable yet; the verification message stands.
            Err(IdentityError::Provider { message }) => {
                debug!("Sign in after sign up was refused: {message}");
                None
            }
            Err(IdentityError::Unexpected(e)) => {
                self.unexpected(e);
                None
            }
        }
    }

    fn unexpected(&mut self, e: anyhow::Error) {
        error!("Auth error: {e:?}");
        self.message = Some(AuthMessage::error(AUTH_FAILED));
    }

    fn outcome(&self, navigation: Option<Navigation>) -> AuthOutcome {
        AuthOutcome {
            message: self.message.clone(),
            navigation,
        }
    }
}
