//! Configuration file handling for taxman.
//!
//! The configuration file is stored at `$TAXMAN_HOME/config.json` and holds the locations of the
//! expenses backend and the identity provider, plus a few behavioral switches.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "taxman";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const SESSION_JSON: &str = "session.json";
const CONFIG_JSON: &str = "config.json";

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:54321";
pub const DEFAULT_EMAIL_REDIRECT_TO: &str = "http://localhost:3000/auth/callback";

/// The remote services taxman talks to. Anything left as `None` takes its default.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Endpoints {
    pub api_url: Option<String>,
    pub auth_url: Option<String>,
    pub anon_key: Option<String>,
    pub email_redirect_to: Option<String>,
}

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$TAXMAN_HOME` and from there it loads `$TAXMAN_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory, its `.secrets` subdirectory and an initial `config.json`.
    ///
    /// # Errors
    /// - Returns an error if any URL in `endpoints` is malformed or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, endpoints: Endpoints) -> Result<Self> {
        let config_file = ConfigFile::from_endpoints(endpoints);
        config_file.validate()?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the taxman home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        let config_path = root.join(CONFIG_JSON);
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that `taxman_home` and the config file exist
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub async fn load(taxman_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = taxman_home.into();
        if !maybe_relative.is_dir() {
            bail!(
                "The taxman home directory '{}' does not exist, run 'taxman init' first",
                maybe_relative.display()
            )
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn api_url(&self) -> &str {
        &self.config_file.api_url
    }

    pub fn auth_url(&self) -> &str {
        &self.config_file.auth_url
    }

    pub fn anon_key(&self) -> &str {
        &self.config_file.anon_key
    }

    pub fn email_redirect_to(&self) -> &str {
        &self.config_file.email_redirect_to
    }

    pub fn auto_sign_in_after_sign_up(&self) -> bool {
        self.config_file.auto_sign_in_after_sign_up
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.config_file.request_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the stored `session_path` if it is absolute, otherwise resolves the relative path.
    pub fn session_path(&self) -> PathBuf {
        let p = self.config_file.session_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "taxman",
///   "config_version": 1,
///   "api_url": "http://localhost:3001",
///   "auth_url": "https://abcdefghijklmnop.supabase.co",
///   "anon_key": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
///   "email_redirect_to": "http://localhost:3000/auth/callback",
///   "auto_sign_in_after_sign_up": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "taxman"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the expenses backend
    #[serde(default = "default_api_url")]
    api_url: String,

    /// Base URL of the identity provider
    #[serde(default = "default_auth_url")]
    auth_url: String,

    /// Public (anon) API key sent to the identity provider
    #[serde(default)]
    anon_key: String,

    /// Where the verification email links back to after sign-up
    #[serde(default = "default_email_redirect_to")]
    email_redirect_to: String,

    /// Whether sign-up immediately signs in with the same credentials, before the email address
    /// has been verified
    #[serde(default = "default_true")]
    auto_sign_in_after_sign_up: bool,

    /// Path to the session file (optional, relative to `$TAXMAN_HOME` or absolute).
    /// Defaults to $TAXMAN_HOME/.secrets/session.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_path: Option<PathBuf>,

    /// Per-request timeout. No timeout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_email_redirect_to() -> String {
    DEFAULT_EMAIL_REDIRECT_TO.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::from_endpoints(Endpoints::default())
    }
}

impl ConfigFile {
    fn from_endpoints(endpoints: Endpoints) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: endpoints.api_url.unwrap_or_else(default_api_url),
            auth_url: endpoints.auth_url.unwrap_or_else(default_auth_url),
            anon_key: endpoints.anon_key.unwrap_or_default(),
            email_redirect_to: endpoints
                .email_redirect_to
                .unwrap_or_else(default_email_redirect_to),
            auto_sign_in_after_sign_up: true,
            session_path: None,
            request_timeout_secs: None,
        }
    }

    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or fails validation
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        anyhow::ensure!(
            self.config_version == CONFIG_VERSION,
            "Unsupported config_version {}, expected {}",
            self.config_version,
            CONFIG_VERSION
        );
        Url::parse(&self.api_url)
            .with_context(|| format!("Invalid api_url '{}'", self.api_url))?;
        Url::parse(&self.auth_url)
            .with_context(|| format!("Invalid auth_url '{}'", self.auth_url))?;
        Ok(())
    }

    /// Gets the session path. If None, defaults to .secrets/session.json
    fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(SESSION_JSON))
    }
}
