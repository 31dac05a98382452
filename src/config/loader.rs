//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable carrying the listen port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable 'PORT' is not set and no listener.port is configured")]
    MissingPort,

    #[error("environment variable 'PORT' cannot be converted to a port: '{0}'")]
    InvalidPort(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Override the listener port with a raw `PORT` value, if one was given.
///
/// A value that is present but not a valid port is an error, never ignored.
pub fn apply_port_override(
    config: &mut BalancerConfig,
    raw_port: Option<&str>,
) -> Result<(), ConfigError> {
    if let Some(raw) = raw_port {
        let port = raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?;
        config.listener.port = Some(port);
    }
    if config.listener.port.is_none() {
        return Err(ConfigError::MissingPort);
    }
    Ok(())
}

/// Load the configuration: optional TOML file, then `PORT`, then validation.
pub fn load_config(path: Option<&Path>) -> Result<BalancerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => BalancerConfig::default(),
    };

    let raw_port = std::env::var(PORT_ENV).ok();
    apply_port_override(&mut config, raw_port.as_deref())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
