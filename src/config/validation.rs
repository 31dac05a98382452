//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem it finds rather than stopping at the first one.

use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully resolved configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.listener.port {
        None => errors.push(ValidationError::new("listener.port", "no port configured")),
        Some(0) => errors.push(ValidationError::new("listener.port", "port must be non-zero")),
        Some(_) => {}
    }

    let addresses = config.backends.addresses();
    if addresses.is_empty() {
        errors.push(ValidationError::new("backends", "at least one backend is required"));
    }

    let mut seen = HashSet::new();
    for (i, address) in addresses.iter().enumerate() {
        let field = format!("backends[{}]", i);
        match Url::parse(address) {
            Ok(url) if url.scheme() != "http" => {
                errors.push(ValidationError::new(&field, format!("unsupported scheme '{}'", url.scheme())));
            }
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::new(&field, "missing host"));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(&field, format!("invalid URL '{}': {}", address, e))),
        }
        if !seen.insert(address.trim_end_matches('/')) {
            errors.push(ValidationError::new(&field, format!("duplicate backend '{}'", address)));
        }
    }

    let hc = &config.health_check;
    if hc.interval_ms == 0 {
        errors.push(ValidationError::new("health_check.interval_ms", "must be greater than 0"));
    }
    if hc.timeout_ms == 0 {
        errors.push(ValidationError::new("health_check.timeout_ms", "must be greater than 0"));
    }
    if !hc.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }

    let proxy = &config.proxy;
    if proxy.deadline_ms == 0 {
        errors.push(ValidationError::new("proxy.deadline_ms", "must be greater than 0"));
    }
    if proxy.attempt_timeout_ms == 0 {
        errors.push(ValidationError::new("proxy.attempt_timeout_ms", "must be greater than 0"));
    }
    if proxy.idle_base_delay_ms == 0 || proxy.idle_max_delay_ms < proxy.idle_base_delay_ms {
        errors.push(ValidationError::new(
            "proxy.idle_max_delay_ms",
            "idle delays must be positive with max >= base",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "not a socket address"));
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
