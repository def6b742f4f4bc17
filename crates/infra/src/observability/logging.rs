//! Tracing subscriber installation

use slotwise_domain::{LoggingConfig, Result, SlotwiseError};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|err| SlotwiseError::Config(format!("invalid log level '{}': {err}", config.level))),
    }
}

/// Install the global `fmt` subscriber, as JSON lines when `config.json` is
/// set.
///
/// # Errors
/// `Config` for an unparsable level, `Internal` when a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| SlotwiseError::Internal(format!("tracing already initialised: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_level() {
        let config = LoggingConfig { level: "slotwise=verbose".into(), json: false };
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(env_filter(&config), Err(SlotwiseError::Config(_))));
        }
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(SlotwiseError::Internal(_))));
    }
}
