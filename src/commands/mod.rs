//! Command handlers for the taxman CLI.
//!
//! Each handler builds the view it needs from the configuration, runs it once and reports the
//! result as an `Out`. A view asking to go to `/login` becomes an error telling the user which
//! command to run.

mod auth;
mod dashboard;
mod init;
mod scan;
mod transactions;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{login, logout, signup, status, SessionStatus};
pub use dashboard::dashboard;
pub use init::init;
pub use scan::scan;
pub use transactions::transactions;

/// The output type for a command. This allows the command to return a consistent message,
/// optionally some structured data, and optionally a rendered view for the terminal.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,

    /// Text written to stdout as-is, such as a rendered table.
    #[serde(skip)]
    display: Option<String>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

/// How `taxman transactions` prints its list.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// An aligned plain-text table.
    #[default]
    Table,
    /// The records as pretty-printed JSON, using the backend's field names.
    Json,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
            display: None,
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
            display: None,
        }
    }

    /// Attach text to be written to stdout.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Print the message to `info!`, the display text (if any) to stdout and the structured data
    /// (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(display) = self.display() {
            print!("{display}");
            if !display.ends_with('\n') {
                println!();
            }
        }
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::Table.to_string(), "table");
    }

    #[test]
    fn test_out_display_is_not_serialized() {
        let out: Out<u8> = Out::new("done", 1).with_display("a table");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "done", "structure": 1 }));
        assert_eq!(out.display(), Some("a table"));
    }
}
