use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::Settings;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured `LOG_LEVEL` is used
/// as the filter directive.
pub fn init(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_ascii_lowercase()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}
