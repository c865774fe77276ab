//! sonar common - shared utilities: logging and configuration

pub mod config;
pub mod logging;

pub use config::{Config, ConfigBuilder};
pub use logging::init_logging;
