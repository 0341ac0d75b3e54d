pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
mod utils;
pub mod views;


pub use api::Mode;
pub use config::{Config, Endpoints};
pub use error::{Error, IdentityError, Result};
