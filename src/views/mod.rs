//! The four screens of the app. Each view owns its own state, is handed its collaborators
//! explicitly, and runs one request/render cycle. Where a browser would change pages, a view
//! returns a `Navigation` instead.

mod auth;
mod dashboard;
mod scan;
mod table;
mod transactions;

use serde::{Deserialize, Serialize};

pub use auth::{validate, AuthMessage, AuthMode, AuthOutcome, AuthView, MessageKind};
pub use dashboard::{DashboardState, DashboardView};
pub use scan::{encode_image, is_image, ProcessReceiptResponse, ScanOutcome, ScanView};
pub use table::render_transactions;
pub use transactions::TransactionListView;

/// The places a view can send the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "/login")]
    Login,
    #[serde(rename = "/scan")]
    Scan,
    #[serde(rename = "/dashboard")]
    Dashboard,
    #[serde(rename = "/transactions")]
    Transactions,
}

serde_plain::derive_display_from_serialize!(Route);
serde_plain::derive_fromstr_from_deserialize!(Route);

impl Route {
    /// The command that shows this route.
    pub fn command(&self) -> &'static str {
        match self {
            Route::Login => "taxman login --email <EMAIL>",
            Route::Scan => "taxman scan <IMAGE>",
            Route::Dashboard => "taxman dashboard",
            Route::Transactions => "taxman transactions",
        }
    }
}

/// A request to move to another route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    route: Route,
    /// A full reload discards all in-app state, as opposed to an in-app transition.
    full_reload: bool,
}

impl Navigation {
    /// An in-app transition.
    pub fn push(route: Route) -> Self {
        Self {
            route,
            full_reload: false,
        }
    }

    /// A full page load.
    pub fn reload(route: Route) -> Self {
        Self {
            route,
            full_reload: true,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn full_reload(&self) -> bool {
        self.full_reload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::from_str("/transactions").unwrap(), Route::Transactions);
        assert!(Route::from_str("/settings").is_err());
    }

    #[test]
    fn test_navigation_kinds() {
        assert!(!Navigation::push(Route::Scan).full_reload());
        assert!(Navigation::reload(Route::Dashboard).full_reload());
    }
}
