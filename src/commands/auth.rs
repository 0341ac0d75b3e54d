//! Session command handlers:
//! - `taxman login` - sign in with email and password
//! - `taxman signup` - create an account, then sign in if the provider allows it
//! - `taxman logout` - end the session
//! - `taxman status` - report whether a session exists

use crate::api::{self, Mode};
use crate::commands::Out;
use crate::views::{AuthMode, AuthOutcome, AuthView, DashboardView};
use crate::{Config, Result};
use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Signs in and saves the session.
///
/// # Errors
/// Returns the form's error message when validation or sign-in fails.
pub async fn login(config: &Config, mode: Mode, email: &str, password: &str) -> Result<Out<()>> {
    let mut view = AuthView::new(api::identity(config, mode).await?, config.email_redirect_to());
    let outcome = view.submit(email, password).await;
    finish(outcome, email)
}

/// Creates an account. Unless `auto_sign_in_after_sign_up` is off, a sign-in is attempted right
/// away; if that is refused (for example because the address is not verified yet) the command
/// still succeeds and asks the user to check their email.
pub async fn signup(config: &Config, mode: Mode, email: &str, password: &str) -> Result<Out<()>> {
    let mut view = AuthView::new(api::identity(config, mode).await?, config.email_redirect_to())
        .auto_sign_in(config.auto_sign_in_after_sign_up());
    view.set_mode(AuthMode::SignUp);
    let outcome = view.submit(email, password).await;
    finish(outcome, email)
}

fn finish(outcome: AuthOutcome, email: &str) -> Result<Out<()>> {
    debug!("{outcome:?}");
    let mut lines = Vec::new();
    if let Some(message) = outcome.message() {
        if message.is_error() {
            bail!("{}", message.text());
        }
        lines.push(message.text().to_string());
    }
    if let Some(navigation) = outcome.navigation() {
        lines.push(format!(
            "Signed in as {email}. Next: '{}'",
            navigation.route().command()
        ));
    }
    Ok(lines.join("\n").into())
}

/// Ends the session. The local session is removed even when the provider cannot be reached.
pub async fn logout(config: &Config, mode: Mode) -> Result<Out<()>> {
    let view = DashboardView::new(
        api::identity(config, mode).await?,
        api::backend(config, mode)?,
    );
    let navigation = view.sign_out().await;
    Ok(format!("Signed out. Sign in again with '{}'", navigation.route().command()).into())
}

/// What `taxman status` reports. Tokens are never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub signed_in: bool,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Reports whether a session exists, refreshing it first if it has expired.
pub async fn status(config: &Config, mode: Mode) -> Result<Out<SessionStatus>> {
    let identity = api::identity(config, mode).await?;
    let status = match identity.get_session().await? {
        Some(session) => SessionStatus {
            signed_in: true,
            email: session.user_email().map(str::to_string),
            expires_at: Some(session.expires_at()),
        },
        None => SessionStatus {
            signed_in: false,
            email: None,
            expires_at: None,
        },
    };
    let message = match (&status.email, status.expires_at) {
        (Some(email), Some(expires_at)) => {
            format!("Signed in as {email}, session expires at {expires_at}")
        }
        (None, Some(expires_at)) => format!("Signed in, session expires at {expires_at}"),
        _ => "Not signed in".to_string(),
    };
    Ok(Out::new(message, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DEMO_EMAIL, DEMO_PASSWORD};
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_login_saves_session() {
        let env = TestEnv::new().await;
        let out = login(&env.config(), Mode::Test, DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        assert!(out.message().contains("Signed in as demo@example.com"));
        assert!(out.message().contains("taxman scan"));

        let saved = env.saved_session().await.unwrap();
        assert_eq!(saved.user_email(), Some(DEMO_EMAIL));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let env = TestEnv::new().await;
        let err = login(&env.config(), Mode::Test, DEMO_EMAIL, "wrong-password")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sign in error: Invalid login credentials");
        assert!(env.saved_session().await.is_none());
    }

    #[tokio::test]
    async fn test_login_short_password() {
        let env = TestEnv::new().await;
        let err = login(&env.config(), Mode::Test, DEMO_EMAIL, "short")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn test_signup_signs_in() {
        let env = TestEnv::new().await;
        let out = signup(&env.config(), Mode::Test, "new@example.com", "secret1")
            .await
            .unwrap();
        assert!(out.message().starts_with("Check your email"));
        assert!(out.message().contains("Signed in as new@example.com"));
    }

    #[tokio::test]
    async fn test_signup_existing_account() {
        let env = TestEnv::new().await;
        let err = signup(&env.config(), Mode::Test, DEMO_EMAIL, "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sign up error: User already registered");
    }

    #[tokio::test]
    async fn test_status_and_logout() {
        let env = TestEnv::signed_in().await;
        let out = status(&env.config(), Mode::Test).await.unwrap();
        let reported = out.structure().unwrap();
        assert!(reported.signed_in);
        assert_eq!(reported.email.as_deref(), Some(DEMO_EMAIL));

        let out = logout(&env.config(), Mode::Test).await.unwrap();
        assert!(out.message().contains("taxman login"));
        assert!(env.saved_session().await.is_none());

        let out = status(&env.config(), Mode::Test).await.unwrap();
        assert!(!out.structure().unwrap().signed_in);
        assert_eq!(out.message(), "Not signed in");
    }

    #[tokio::test]
    async fn test_logout_removes_corrupt_session() {
        let env = TestEnv::new().await;
        let path = env.config().session_path();
        std::fs::write(&path, "{not json").unwrap();

        logout(&env.config(), Mode::Test).await.unwrap();
        assert!(!path.exists());
        let out = status(&env.config(), Mode::Test).await.unwrap();
        assert!(!out.structure().unwrap().signed_in);
    }
}
