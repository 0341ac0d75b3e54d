//! Types that represent the data exchanged with the identity provider and the expenses backend,
//! such as `Session`, `Transaction` and `DashboardStats`.
mod amount;
mod risk;
mod session;
mod stats;
mod transaction;

pub use amount::{Amount, AmountError};
pub use risk::{RiskScore, RiskTier, HIGH_RISK, MAX_SCORE, MEDIUM_RISK};
pub use session::Session;
pub use stats::DashboardStats;
pub use transaction::{Transaction, TransactionId};
