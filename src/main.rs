use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use taxman::args::{Args, Command, CredentialArgs};
use taxman::{commands, Config, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().taxman_home().path();

    // This allows for running the program without an identity provider or backend. When
    // TAXMAN_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Http.
    let mode = Mode::from_env();
    let color = std::io::stdout().is_terminal();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.endpoints()).await?.print(),

        Command::Login(creds) => {
            let config = Config::load(home).await?;
            let password = password(creds)?;
            commands::login(&config, mode, creds.email(), &password)
                .await?
                .print()
        }

        Command::Signup(creds) => {
            let config = Config::load(home).await?;
            let password = password(creds)?;
            commands::signup(&config, mode, creds.email(), &password)
                .await?
                .print()
        }

        Command::Logout => commands::logout(&Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Status => commands::status(&Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Dashboard => commands::dashboard(&Config::load(home).await?, mode, color)
            .await?
            .print(),

        Command::Scan(scan_args) => {
            let config = Config::load(home).await?;
            commands::scan(&config, mode, scan_args.image())
                .await?
                .print()
        }

        Command::Transactions(list_args) => {
            let config = Config::load(home).await?;
            commands::transactions(&config, mode, list_args.format(), color)
                .await?
                .print()
        }
    };
    Ok(())
}

/// Takes the password from the arguments, or asks for it without echoing.
fn password(creds: &CredentialArgs) -> Result<String> {
    match creds.password() {
        Some(password) => Ok(password.to_string()),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
