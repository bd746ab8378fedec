//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check addresses used by optional subsystems parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PolicyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::PolicyConfig;
use crate::protocol::POLICY_REQUEST;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.port must be non-zero")]
    ZeroPort,

    #[error("server.timeout_secs must be non-zero")]
    ZeroTimeout,

    #[error("server.backlog must be non-zero")]
    ZeroBacklog,

    #[error("server.max_request_bytes must be at least {min}, got {actual}")]
    RequestCapTooSmall { min: usize, actual: usize },

    #[error("server.max_clients must be non-zero when enforce_max_clients is set")]
    ZeroMaxClients,

    #[error("logging.level must not be empty")]
    EmptyLogLevel,

    #[error("{field} is not a socket address: {value}")]
    BadAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PolicyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if server.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if server.backlog == 0 {
        errors.push(ValidationError::ZeroBacklog);
    }
    if server.max_request_bytes < POLICY_REQUEST.len() {
        errors.push(ValidationError::RequestCapTooSmall {
            min: POLICY_REQUEST.len(),
            actual: server.max_request_bytes,
        });
    }
    if server.enforce_max_clients && server.max_clients == 0 {
        errors.push(ValidationError::ZeroMaxClients);
    }
    if config.logging.level.trim().is_empty() {
        errors.push(ValidationError::EmptyLogLevel);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::BadAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&PolicyConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = PolicyConfig::default();
        config.server.port = 0;
        config.server.timeout_secs = 0;
        config.server.max_request_bytes = 4;
        config.admin.enabled = true;
        config.admin.bind_address = "not an address".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::RequestCapTooSmall { min: 23, actual: 4 }));
        assert!(errors.contains(&ValidationError::MissingApiKey));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn max_clients_only_checked_when_enforced() {
        let mut config = PolicyConfig::default();
        config.server.max_clients = 0;
        assert!(validate_config(&config).is_ok());

        config.server.enforce_max_clients = true;
        assert_eq!(validate_config(&config), Err(vec![ValidationError::ZeroMaxClients]));
    }

    #[test]
    fn request_cap_must_fit_a_full_request() {
        let mut config = PolicyConfig::default();
        config.server.max_request_bytes = POLICY_REQUEST.len() - 1;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::RequestCapTooSmall {
                min: POLICY_REQUEST.len(),
                actual: POLICY_REQUEST.len() - 1,
            }])
        );

        config.server.max_request_bytes = POLICY_REQUEST.len();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
