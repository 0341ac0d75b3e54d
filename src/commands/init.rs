use crate::commands::Out;
use crate::{Config, Endpoints, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its `.secrets` subdirectory and an initial `config.json` pointing
/// at `endpoints`, with defaults for anything not given.
///
/// # Errors
/// - Returns an error if a URL is malformed or any file operation fails.
pub async fn init(taxman_home: &Path, endpoints: Endpoints) -> Result<Out<()>> {
    let config = Config::create(taxman_home, endpoints)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Created the taxman directory and config at {}. Next, sign in with 'taxman login'",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_load() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("taxman");
        let endpoints = Endpoints {
            api_url: Some("https://api.example.com".to_string()),
            ..Endpoints::default()
        };
        let out = init(&home, endpoints).await.unwrap();
        assert!(out.message().contains("Created the taxman directory"));

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.api_url(), "https://api.example.com");
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let tmp = TempDir::new().unwrap();
        let endpoints = Endpoints {
            auth_url: Some("not a url".to_string()),
            ..Endpoints::default()
        };
        assert!(init(tmp.path(), endpoints).await.is_err());
    }
}
