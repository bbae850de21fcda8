//! Tracing subscriber set-up.

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::WebPartsError;

/// Installs a stderr `fmt` subscriber filtered at `level`.
///
/// `RUST_LOG` directives still apply on top of the configured level. An
/// already installed global subscriber is left in place.
pub fn init(level: &str) -> Result<(), WebPartsError> {
    let level: tracing::Level = level
        .trim()
        .parse()
        .map_err(|_| WebPartsError::InvalidConfig(format!("invalid log.level '{level}'").into()))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
    Ok(())
}
