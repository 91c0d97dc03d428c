//! CLI command implementation

pub mod crawl;
pub mod error;

pub use crawl::{parameter_banner, Cli};
pub use error::CliError;
