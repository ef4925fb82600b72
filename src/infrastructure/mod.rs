//! Infrastructure layer
//!
//! Settings and logging setup for the binary and embedding hosts.

mod config;
mod logging;

pub use config::Settings;
pub use logging::init_logging;
