use crate::api::{self, Mode};
use crate::commands::Out;
use crate::views::{DashboardState, DashboardView, Navigation};
use crate::{Config, Result};
use anyhow::bail;

/// Fetches and renders the dashboard.
pub async fn dashboard(config: &Config, mode: Mode, color: bool) -> Result<Out<DashboardState>> {
    let mut view = DashboardView::new(
        api::identity(config, mode).await?,
        api::backend(config, mode)?,
    );
    if let Some(navigation) = view.mount().await {
        not_signed_in(navigation)?;
    }
    let flagged = view.state().flagged().len();
    Ok(Out::new(
        format!("Dashboard loaded with {flagged} flagged transaction(s)"),
        view.state().clone(),
    )
    .with_display(view.render(color)))
}

/// Turns a redirect to the login screen into an error naming the command to run.
pub(super) fn not_signed_in(navigation: Navigation) -> Result<()> {
    bail!(
        "You are not signed in, run '{}' first",
        navigation.route().command()
    )
}
