//! The leakage risk score the backend attaches to each transaction, and the three display tiers
//! derived from it.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Scores at or above this are high risk.
pub const HIGH_RISK: u8 = 7;
/// Scores at or above this (and below `HIGH_RISK`) are medium risk.
pub const MEDIUM_RISK: u8 = 4;
/// The top of the scale.
pub const MAX_SCORE: u8 = 10;

/// Integer leakage risk score, nominally 0 to 10.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(transparent)]
pub struct RiskScore(u8);

impl RiskScore {
    pub const fn new(score: u8) -> Self {
        Self(score)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn tier(&self) -> RiskTier {
        RiskTier::from_score(self.0)
    }
}

impl Display for RiskScore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{MAX_SCORE}", self.0)
    }
}

impl<'de> Deserialize<'de> for RiskScore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RiskScoreVisitor)
    }
}

struct RiskScoreVisitor;

impl<'de> Visitor<'de> for RiskScoreVisitor {
    type Value = RiskScore;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer risk score")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RiskScore, E> {
        u8::try_from(v)
            .map(RiskScore)
            .map_err(|_| E::custom(format!("risk score {v} is out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RiskScore, E> {
        u8::try_from(v)
            .map(RiskScore)
            .map_err(|_| E::custom(format!("risk score {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RiskScore, E> {
        if !(0.0..=f64::from(u8::MAX)).contains(&v) {
            return Err(E::custom(format!("risk score {v} is out of range")));
        }
        Ok(RiskScore(v.trunc() as u8))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RiskScore, E> {
        Ok(RiskScore::default())
    }
}

/// How a risk score is styled when displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

serde_plain::derive_display_from_serialize!(RiskTier);

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_RISK {
            RiskTier::High
        } else if score >= MEDIUM_RISK {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    /// The ANSI color escape used for this tier in terminal output.
    pub fn ansi(&self) -> &'static str {
        match self {
            RiskTier::High => "\x1b[31m",
            RiskTier::Medium => "\x1b[33m",
            RiskTier::Low => "\x1b[32m",
        }
    }

    /// Wraps `text` in this tier's color.
    pub fn paint(&self, text: &str) -> String {
        format!("{}{text}\x1b[0m", self.ansi())
    }
}
