use crate::api::{self, Mode};
use crate::commands::Out;
use crate::views::{ScanOutcome, ScanView};
use crate::{Config, Result};
use anyhow::bail;
use std::path::Path;
use tracing::info;

/// Uploads the receipt image at `image` for processing.
///
/// # Errors
/// Returns the alert text when the receipt could not be processed.
pub async fn scan(config: &Config, mode: Mode, image: &Path) -> Result<Out<ScanOutcome>> {
    let mut view = ScanView::new(
        api::identity(config, mode).await?,
        api::backend(config, mode)?,
    );
    info!("{}", ScanView::BUSY_MESSAGE);
    let outcome = view.upload(image).await;
    match &outcome {
        ScanOutcome::Processed { message, navigation } => Ok(Out::new(
            format!("{message} View it with '{}'", navigation.route().command()),
            outcome.clone(),
        )),
        ScanOutcome::Alert { message } => bail!("{message}"),
    }
}
