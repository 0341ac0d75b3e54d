//! Transaction records as the expenses backend returns them.

use crate::model::{Amount, RiskScore, RiskTier};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};

/// A single expense. Field names on the wire follow the backend's column names.
///
/// Records are not validated beyond decoding. Flagged transactions come back in the same shape
/// but are not guaranteed to carry every column, so everything except `id` tolerates being
/// missing or `null`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    #[serde(default, deserialize_with = "nullable")]
    date: String,
    #[serde(default, deserialize_with = "nullable")]
    merchant: String,
    #[serde(default, deserialize_with = "nullable")]
    category: String,
    #[serde(rename = "total_amount_numeric", default, deserialize_with = "nullable")]
    amount: Amount,
    #[serde(rename = "leakage_risk_score", default, deserialize_with = "nullable")]
    risk_score: RiskScore,
    #[serde(default, deserialize_with = "nullable")]
    tax_deductible: bool,
}

impl Transaction {
    pub fn new(
        id: impl Into<TransactionId>,
        date: impl Into<String>,
        merchant: impl Into<String>,
        category: impl Into<String>,
        amount: Amount,
        risk_score: RiskScore,
        tax_deductible: bool,
    ) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            merchant: merchant.into(),
            category: category.into(),
            amount,
            risk_score,
            tax_deductible,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn risk_score(&self) -> RiskScore {
        self.risk_score
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.risk_score.tier()
    }

    pub fn tax_deductible(&self) -> bool {
        self.tax_deductible
    }
}

/// Transaction ids are integers or UUID strings depending on how the backend's table was set up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionId {
    Number(i64),
    Text(String),
}

impl Default for TransactionId {
    fn default() -> Self {
        TransactionId::Text(String::new())
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionId::Number(n) => write!(f, "{n}"),
            TransactionId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for TransactionId {
    fn from(value: i64) -> Self {
        TransactionId::Number(value)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId::Text(value.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId::Text(value)
    }
}

/// Treats an explicit JSON `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
