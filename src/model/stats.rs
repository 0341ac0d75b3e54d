use crate::model::Amount;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Aggregate statistics shown on the dashboard. Every field is optional; a missing value renders
/// as zero.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(
        rename = "totalExpensesYTD",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    total_expenses_ytd: Option<Amount>,

    #[serde(
        rename = "totalGSTClaimed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    total_gst_claimed: Option<Amount>,

    #[serde(
        rename = "totalOtherTaxes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    total_other_taxes: Option<Amount>,

    #[serde(
        rename = "riskScoreAverage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    risk_score_average: Option<RiskAverage>,
}

impl DashboardStats {
    pub fn new(
        total_expenses_ytd: Option<Amount>,
        total_gst_claimed: Option<Amount>,
        total_other_taxes: Option<Amount>,
        risk_score_average: Option<f64>,
    ) -> Self {
        Self {
            total_expenses_ytd,
            total_gst_claimed,
            total_other_taxes,
            risk_score_average: risk_score_average.map(RiskAverage::Number),
        }
    }

    pub fn total_expenses_ytd(&self) -> Amount {
        self.total_expenses_ytd.unwrap_or_default()
    }

    pub fn total_gst_claimed(&self) -> Amount {
        self.total_gst_claimed.unwrap_or_default()
    }

    pub fn total_other_taxes(&self) -> Amount {
        self.total_other_taxes.unwrap_or_default()
    }

    /// The average risk score as the backend sent it, `0` when absent.
    pub fn risk_score_average(&self) -> String {
        self.risk_score_average
            .as_ref()
            .map(|avg| avg.to_string())
            .unwrap_or_else(|| "0".to_string())
    }
}

/// The backend computes the average with `toFixed`, so depending on version it arrives as a
/// number or as a string such as `"4.50"`. It is only ever displayed, so it is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RiskAverage {
    Number(f64),
    Text(String),
}

impl Display for RiskAverage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskAverage::Number(n) => write!(f, "{n}"),
            RiskAverage::Text(s) if s.is_empty() => write!(f, "0"),
            RiskAverage::Text(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_deserialize_full() {
        let json = r#"{
            "totalExpensesYTD": 125000.5,
            "totalGSTClaimed": 8200,
            "totalOtherTaxes": 1200.25,
            "riskScoreAverage": "4.50"
        }"#;
        let stats: DashboardStats = serde_json::from_str(json).unwrap();
        assert_eq!(
            stats.total_expenses_ytd(),
            Amount::from_str("125000.5").unwrap()
        );
        assert_eq!(stats.total_gst_claimed().to_string(), "₹8,200.00");
        assert_eq!(stats.risk_score_average(), "4.50");
    }

    #[test]
    fn test_missing_fields_are_zero() {
        let stats: DashboardStats = serde_json::from_str(r#"{"totalGSTClaimed": null}"#).unwrap();
        assert!(stats.total_expenses_ytd().is_zero());
        assert!(stats.total_gst_claimed().is_zero());
        assert!(stats.total_other_taxes().is_zero());
        assert_eq!(stats.risk_score_average(), "0");
    }

    #[test]
    fn test_numeric_average_display() {
        let stats = DashboardStats::new(None, None, None, Some(6.0));
        assert_eq!(stats.risk_score_average(), "6");
    }
}
