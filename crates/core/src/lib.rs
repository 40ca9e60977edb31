//! Core utilities shared by every vkframe crate.
//!
//! - Error type and result alias for platform and configuration code
//! - Logging initialization
//! - Frame timer
//! - TOML configuration

pub mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, ConfigSource};
pub use error::{Error, Result};
pub use logging::{init_logging, init_logging_with};
pub use timer::Timer;
