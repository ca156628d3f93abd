//! Shared helpers: logging setup, bounded external commands and run-id path keys

pub mod logging;
pub mod path_key;
pub mod process;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use path_key::path_key;
pub use process::{run_command, CommandError, CommandOutput, CommandSpec};
