//! Plain-text table rendering for transaction lists.

use crate::model::{RiskTier, Transaction};
use std::fmt::Write;

const HEADERS: [&str; 6] = [
    "Date",
    "Merchant",
    "Category",
    "Amount",
    "Risk Score",
    "Tax Deductible",
];

/// Marks high risk rows in front of the merchant name.
const HIGH_RISK_MARKER: &str = "● ";

struct Cell {
    text: String,
    tier: Option<RiskTier>,
}

/// Renders one row per transaction. With `color`, risk scores are painted by tier.
pub fn render_transactions(transactions: &[Transaction], color: bool) -> String {
    let rows: Vec<[Cell; 6]> = transactions.iter().map(row).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.text.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| pad(h, w))
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| {
                let padded = pad(&cell.text, w);
                match cell.tier {
                    Some(tier) if color => tier.paint(&padded),
                    _ => padded,
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    out
}

fn row(txn: &Transaction) -> [Cell; 6] {
    let marker = if txn.risk_tier() == RiskTier::High {
        HIGH_RISK_MARKER
    } else {
        ""
    };
    [
        plain(txn.date()),
        plain(&format!("{marker}{}", txn.merchant())),
        plain(txn.category()),
        plain(&txn.amount().to_string()),
        Cell {
            text: txn.risk_score().to_string(),
            tier: Some(txn.risk_tier()),
        },
        plain(if txn.tax_deductible() { "Yes" } else { "No" }),
    ]
}

fn plain(text: &str) -> Cell {
    Cell {
        text: text.to_string(),
        tier: None,
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{text}{}", " ".repeat(width.saturating_sub(len)))
}
