use crate::api::{self, Backend, Fetched, Identity, EXPENSES};
use crate::model::Transaction;
use crate::views::{render_transactions, Navigation, Route};
use std::sync::Arc;
use tracing::{error, warn};

/// Every transaction, in the order the backend returns them.
pub struct TransactionListView {
    identity: Arc<dyn Identity>,
    backend: Arc<dyn Backend>,
    transactions: Vec<Transaction>,
}

impl TransactionListView {
    pub fn new(identity: Arc<dyn Identity>, backend: Arc<dyn Backend>) -> Self {
        Self {
            identity,
            backend,
            transactions: Vec::new(),
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Loads the list, or redirects to `/login` without requesting anything.
    pub async fn mount(&mut self) -> Option<Navigation> {
        let session = match self.identity.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Some(Navigation::push(Route::Login)),
            Err(e) => {
                error!("Unable to get the current session: {e:?}");
                return None;
            }
        };

        match api::get_json::<Vec<Transaction>>(self.backend.as_ref(), &session, EXPENSES).await {
            Fetched::Ok(transactions) => self.transactions = transactions,
            Fetched::Failed(failure) => {
                warn!("Error fetching transactions: {failure}");
                self.transactions.clear();
            }
        }
        None
    }

    pub fn render(&self, color: bool) -> String {
        render_transactions(&self.transactions, color)
    }
}
