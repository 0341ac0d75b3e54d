//! The dashboard: aggregate stats and flagged transactions, fetched side by side.

use crate::api::{self, Backend, Fetched, Identity, DASHBOARD, FLAGGED};
use crate::model::{DashboardStats, Transaction};
use crate::views::{render_transactions, Navigation, Route};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, warn};

/// What the dashboard currently shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    loading: bool,
    stats: Option<DashboardStats>,
    flagged: Vec<Transaction>,
}

impl DashboardState {
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// `None` until the stats have been fetched, and when the backend has none.
    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    pub fn flagged(&self) -> &[Transaction] {
        &self.flagged
    }
}

pub struct DashboardView {
    identity: Arc<dyn Identity>,
    backend: Arc<dyn Backend>,
    state: DashboardState,
}

impl DashboardView {
    pub fn new(identity: Arc<dyn Identity>, backend: Arc<dyn Backend>) -> Self {
        Self {
            identity,
            backend,
            state: DashboardState {
                loading: true,
                ..DashboardState::default()
            },
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Loads the dashboard. Returns a redirect to `/login` when nobody is signed in, in which
    /// case nothing is requested from the backend.
    pub async fn mount(&mut self) -> Option<Navigation> {
        let session = match self.identity.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Some(Navigation::push(Route::Login)),
            Err(e) => {
                error!("Unable to get the current session: {e:?}");
                self.state.loading = false;
                return None;
            }
        };

        let backend = self.backend.as_ref();
        let (stats, flagged) = tokio::join!(
            api::get_json::<Option<DashboardStats>>(backend, &session, DASHBOARD),
            api::get_json::<Vec<Transaction>>(backend, &session, FLAGGED),
        );

        match stats {
            Fetched::Ok(stats) => self.state.stats = stats,
            Fetched::Failed(failure) => warn!("Error fetching dashboard data: {failure}"),
        }
        match flagged {
            Fetched::Ok(flagged) => self.state.flagged = flagged,
            Fetched::Failed(failure) => warn!("Error fetching flagged transactions: {failure}"),
        }
        self.state.loading = false;
        None
    }

    /// Signs out and returns to the login screen. The local session is gone even if the
    /// provider could not be reached, so the redirect happens either way.
    pub async fn sign_out(&self) -> Navigation {
        if let Err(e) = self.identity.sign_out().await {
            warn!("Sign out did not complete cleanly: {e}");
        }
        Navigation::push(Route::Login)
    }

    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Smart Tax Manager");
        let _ = writeln!(out, "AI-Powered Expense Tracking");
        let _ = writeln!(out);

        if self.state.loading {
            let _ = writeln!(out, "Loading...");
            return out;
        }

        match &self.state.stats {
            None => {
                let _ = writeln!(out, "Welcome to Smart Tax Manager!");
                let _ = writeln!(
                    out,
                    "Start by scanning your first receipt to track expenses and identify \
                    financial leakages."
                );
            }
            Some(stats) => {
                let cards = [
                    ("Total Expenses YTD", stats.total_expenses_ytd().to_string()),
                    ("Total GST Claimed", stats.total_gst_claimed().to_string()),
                    ("Other Taxes Paid", stats.total_other_taxes().to_string()),
                    (
                        "Risk Score Average",
                        format!("{}/10", stats.risk_score_average()),
                    ),
                ];
                let width = cards.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
                for (label, value) in cards {
                    let _ = writeln!(out, "{label:<width$}  {value}");
                }
            }
        }

        if !self.state.flagged.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "High Risk Transactions");
            out.push_str(&render_transactions(&self.state.flagged, color));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FetchFailure, IdentityCall, TestBackend, TestIdentity};
    use serde_json::{json, Value};

    fn view(identity: &Arc<TestIdentity>, backend: &Arc<TestBackend>) -> DashboardView {
        DashboardView::new(identity.clone(), backend.clone())
    }

    #[tokio::test]
    async fn test_no_session_redirects_without_requests() {
        let identity = Arc::new(TestIdentity::default());
        let backend = Arc::new(TestBackend::default());
        let mut view = view(&identity, &backend);
        assert_eq!(view.mount().await, Some(Navigation::push(Route::Login)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_mount_fetches_stats_and_flagged() {
        let identity = Arc::new(TestIdentity::signed_in());
        let backend = Arc::new(TestBackend::default());
        let mut view = view(&identity, &backend);
        assert!(view.state().loading());

        assert_eq!(view.mount().await, None);
        let state = view.state();
        assert!(!state.loading());
        assert_eq!(state.stats().unwrap().risk_score_average(), "5.50");
        assert_eq!(state.flagged().len(), 2);

        let mut paths: Vec<String> = backend.requests().into_iter().map(|r| r.path).collect();
        paths.sort();
        assert_eq!(paths, vec![DASHBOARD.to_string(), FLAGGED.to_string()]);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_other() {
        let identity = Arc::new(TestIdentity::signed_in());
        let backend = Arc::new(TestBackend::default());
        backend.fail(DASHBOARD, FetchFailure::Transport("refused".to_string()));
        let mut view = view(&identity, &backend);
        view.mount().await;
        assert!(view.state().stats().is_none());
        assert_eq!(view.state().flagged().len(), 2);
        assert!(!view.state().loading());
    }

    #[tokio::test]
    async fn test_null_stats_render_welcome() {
        let identity = Arc::new(TestIdentity::signed_in());
        let backend = Arc::new(TestBackend::empty());
        let mut view = view(&identity, &backend);
        view.mount().await;
        let rendered = view.render(false);
        assert!(rendered.contains("Welcome to Smart Tax Manager!"));
        assert!(!rendered.contains("High Risk Transactions"));
    }

    #[tokio::test]
    async fn test_render_cards() {
        let identity = Arc::new(TestIdentity::signed_in());
        let backend = Arc::new(TestBackend::default());
        backend.respond(
            DASHBOARD,
            json!({ "totalExpensesYTD": 1500, "riskScoreAverage": 3.2 }),
        );
        backend.respond(FLAGGED, Value::Array(vec![]));
        let mut view = view(&identity, &backend);
        view.mount().await;
        let rendered = view.render(false);
        assert!(rendered.contains("₹1,500.00"));
        assert!(rendered.contains("Other Taxes Paid"));
        assert!(rendered.contains("₹0.00"));
        assert!(rendered.contains("3.2/10"));
    }

    #[tokio::test]
    async fn test_session_error_stops_loading() {
        let identity = Arc::new(TestIdentity::signed_in());
        identity.fail_get_session();
        let backend = Arc::new(TestBackend::default());
        let mut view = view(&identity, &backend);
        assert_eq!(view.mount().await, None);
        assert!(!view.state().loading());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_navigates_to_login() {
        let identity = Arc::new(TestIdentity::signed_in());
        let backend = Arc::new(TestBackend::default());
        let view = view(&identity, &backend);
        assert_eq!(view.sign_out().await, Navigation::push(Route::Login));
        assert!(identity.calls().contains(&IdentityCall::SignOut));
        assert!(identity.current_session().is_none());
    }
}
