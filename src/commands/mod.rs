//! Command handlers module.
//!
//! - `io.rs`: export, import, and archive probe commands
//! - `config.rs`: configuration display command

mod config;
mod io;

pub use config::cmd_config;
pub use io::{cmd_export, cmd_import, cmd_probe};
