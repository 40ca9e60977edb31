//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when neither `RUST_LOG` nor a config value is set.
pub const DEFAULT_LOG_FILTER: &str = "info,vkframe=debug";

/// Initialize tracing with the default filter.
///
/// `RUST_LOG` takes precedence when set.
///
/// # Example
/// ```
/// vkframe_core::init_logging();
/// tracing::info!("Renderer initialized");
/// ```
pub fn init_logging() {
    init_logging_with(DEFAULT_LOG_FILTER);
}

/// Initialize tracing with `fallback` as the filter when `RUST_LOG` is unset.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging_with(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialized (fallback filter '{}')", fallback);
    }
}
