//! These structs provide the CLI interface for the taxman CLI.

use crate::commands::OutputFormat;
use crate::Endpoints;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// taxman: Smart Tax Manager from the command line.
///
/// Scan receipts, track expenses and see which transactions look like financial leakage. Receipts
/// are sent to the Smart Tax Manager backend, which extracts the details and scores each expense
/// for leakage risk.
///
/// Start with `taxman init`, then `taxman login` (or `taxman signup`).
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/taxman;
    /// pass --taxman-home to put it somewhere else. Every endpoint has a default suitable for
    /// local development.
    Init(InitArgs),
    /// Sign in with your email and password.
    Login(CredentialArgs),
    /// Create an account. You are signed in straight away if the server allows it.
    Signup(CredentialArgs),
    /// Sign out and forget the saved session.
    Logout,
    /// Show whether you are signed in.
    Status,
    /// Show your expense totals and the transactions flagged as high risk.
    Dashboard,
    /// Upload a receipt image for processing.
    Scan(ScanArgs),
    /// List all of your transactions.
    Transactions(TransactionsArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where taxman configuration and your session are held. Defaults to ~/taxman
    #[arg(long, env = "TAXMAN_HOME", default_value_t = default_taxman_home())]
    taxman_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, taxman_home: PathBuf) -> Self {
        Self {
            log_level,
            taxman_home: taxman_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn taxman_home(&self) -> &DisplayPath {
        &self.taxman_home
    }
}

/// (Not shown): Args for the `taxman init` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct InitArgs {
    /// Base URL of the expenses backend. Defaults to http://localhost:3001
    #[arg(long)]
    api_url: Option<String>,

    /// Base URL of the identity provider. Defaults to http://localhost:54321
    #[arg(long)]
    auth_url: Option<String>,

    /// The public (anonymous) API key of the identity provider.
    #[arg(long, env = "TAXMAN_ANON_KEY")]
    anon_key: Option<String>,

    /// Where the link in the verification email points.
    /// Defaults to http://localhost:3000/auth/callback
    #[arg(long)]
    email_redirect_to: Option<String>,
}

impl InitArgs {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_url: self.api_url.clone(),
            auth_url: self.auth_url.clone(),
            anon_key: self.anon_key.clone(),
            email_redirect_to: self.email_redirect_to.clone(),
        }
    }
}

/// (Not shown): Args for the `taxman login` and `taxman signup` commands.
#[derive(Debug, Parser, Clone)]
pub struct CredentialArgs {
    #[arg(long)]
    email: String,

    /// If omitted, you are prompted for it.
    #[arg(long, env = "TAXMAN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl CredentialArgs {
    pub fn new(email: impl Into<String>, password: Option<String>) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// (Not shown): Args for the `taxman scan` command.
#[derive(Debug, Parser, Clone)]
pub struct ScanArgs {
    /// The receipt image: jpg, jpeg, png, gif, webp, heic, bmp, tif or tiff.
    image: PathBuf,
}

impl ScanArgs {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
        }
    }

    pub fn image(&self) -> &Path {
        &self.image
    }
}

/// (Not shown): Args for the `taxman transactions` command.
#[derive(Debug, Parser, Clone)]
pub struct TransactionsArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl TransactionsArgs {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn default_taxman_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("taxman"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --taxman-home or TAXMAN_HOME instead of relying on the default \
                taxman home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("taxman")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan() {
        let args = Args::try_parse_from([
            "taxman",
            "--taxman-home",
            "/tmp/th",
            "scan",
            "receipt.jpg",
        ])
        .unwrap();
        assert_eq!(args.common().taxman_home().path(), Path::new("/tmp/th"));
        match args.command() {
            Command::Scan(scan) => assert_eq!(scan.image(), Path::new("receipt.jpg")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_transactions_format() {
        let args = Args::try_parse_from(["taxman", "transactions", "--format", "json"]).unwrap();
        match args.command() {
            Command::Transactions(t) => assert_eq!(t.format(), OutputFormat::Json),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_login_without_password() {
        let args = Args::try_parse_from([
            "taxman",
            "--log-level",
            "debug",
            "login",
            "--email",
            "a@example.com",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        match args.command() {
            Command::Login(creds) => assert_eq!(creds.email(), "a@example.com"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_init_endpoints() {
        let args = Args::try_parse_from(["taxman", "init", "--api-url", "https://api.example.com"])
            .unwrap();
        match args.command() {
            Command::Init(init) => {
                let endpoints = init.endpoints();
                assert_eq!(endpoints.api_url.as_deref(), Some("https://api.example.com"));
                assert!(endpoints.auth_url.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
