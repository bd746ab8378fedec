//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the policy server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Listener and per-connection protocol settings.
    pub server: ServerConfig,

    /// Contents of the served policy document.
    pub policy: DocumentConfig,

    /// Log destination and verbosity.
    pub logging: LoggingConfig,

    /// Periodic stats reporting.
    pub stats: StatsConfig,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,

    /// Read-only admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host, use 0.0.0.0 for all addresses.
    pub host: String,

    /// Listen port. Ports below 1024 need elevated privileges.
    pub port: u16,

    /// Pending connection queue length passed to listen(2).
    pub backlog: u32,

    /// Seconds a client has to complete the whole exchange.
    pub timeout_secs: u64,

    /// Advisory client limit; only enforced with `enforce_max_clients`.
    pub max_clients: usize,

    /// Bound concurrent workers to `max_clients`.
    pub enforce_max_clients: bool,

    /// Largest request chunk accepted before the client is dropped as bogus.
    pub max_request_bytes: usize,
}

impl ServerConfig {
    /// The per-connection deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10843,
            backlog: 1024,
            timeout_secs: 10,
            max_clients: 10,
            enforce_max_clients: false,
            max_request_bytes: 4096,
        }
    }
}

/// Policy document configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Domains granted access, rendered in this order.
    pub domains: Vec<String>,

    /// XML-escape domain strings before rendering.
    pub escape_domains: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            domains: vec!["*".to_string()],
            escape_domains: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub level: String,

    /// Human-readable or JSON lines.
    pub format: LogFormat,

    /// Append to this file instead of stdout.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Stats reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StatsConfig {
    /// Log the stats line every N seconds; 0 disables.
    pub interval_secs: u64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address.
    pub bind_address: String,

    /// Bearer token required on every admin request.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:10844".to_string(),
            api_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_options() {
        let config = PolicyConfig::default();
        assert_eq!(config.server.port, 10843);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.timeout_secs, 10);
        assert_eq!(config.server.max_clients, 10);
        assert!(!config.server.enforce_max_clients);
        assert_eq!(config.policy.domains, vec!["*".to_string()]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PolicyConfig = toml::from_str(
            r#"
            [server]
            port = 2000

            [policy]
            domains = ["example.com", "*.example.org"]

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 2000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.policy.domains.len(), 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }
}
