use crate::api::{self, Mode};
use crate::commands::dashboard::not_signed_in;
use crate::commands::{Out, OutputFormat};
use crate::model::Transaction;
use crate::views::TransactionListView;
use crate::{Config, Result};
use anyhow::Context;

/// Lists every transaction as a table or as JSON.
pub async fn transactions(
    config: &Config,
    mode: Mode,
    format: OutputFormat,
    color: bool,
) -> Result<Out<Vec<Transaction>>> {
    let mut view = TransactionListView::new(
        api::identity(config, mode).await?,
        api::backend(config, mode)?,
    );
    if let Some(navigation) = view.mount().await {
        not_signed_in(navigation)?;
    }

    let display = match format {
        OutputFormat::Table => view.render(color),
        OutputFormat::Json => serde_json::to_string_pretty(view.transactions())
            .context("Unable to serialize transactions")?,
    };
    let count = view.transactions().len();
    Ok(Out::new(
        format!("Found {count} transaction(s)"),
        view.transactions().to_vec(),
    )
    .with_display(display))
}
