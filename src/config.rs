//! Layered configuration using Figment
//!
//! Configuration is merged from (later wins):
//! 1. Built-in defaults
//! 2. `config/discovery.toml` (or a file given with `--config`)
//! 3. Environment variables prefixed with `KUDU_DISCOVERY_`
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Example
//! ```no_run
//! use kudu_discovery::config::DiscoveryConfig;
//!
//! let config = DiscoveryConfig::load()?;
//! config.validate()?;
//! println!("Master: {}", config.master);
//! # Ok::<(), kudu_discovery::config::ConfigError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use kudu_client::{ChannelConfig, MasterEndpoint, TransportMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::OutputFormat;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/discovery.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "KUDU_DISCOVERY_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Figment could not merge or extract the configuration.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Log level is not one of trace, debug, info, warn, error.
    #[error("Invalid log_level '{0}'. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// No transport mode was chosen.
    #[error("transport must be set explicitly to 'insecure' or 'tls'")]
    MissingTransport,

    /// TLS-only settings were given for an insecure transport.
    #[error("tls_domain and ca_certificate require transport = 'tls'")]
    TlsOptionsWithoutTls,

    /// The CA certificate file could not be read.
    #[error("Failed to read CA certificate {path}: {source}")]
    CaCertificate {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Transport choice as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Plaintext, unauthenticated
    Insecure,
    /// TLS
    Tls,
}

/// Top-level discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Master to contact
    #[serde(default)]
    pub master: MasterEndpoint,
    /// Deadline for the `ListMasters` call
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Optional bound on connection establishment
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    /// Transport security, must be set explicitly
    #[serde(default)]
    pub transport: Option<TransportKind>,
    /// Server name to verify when using TLS
    #[serde(default)]
    pub tls_domain: Option<String>,
    /// Extra PEM CA certificate when using TLS
    #[serde(default)]
    pub ca_certificate: Option<PathBuf>,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: OutputFormat,
}

fn default_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            master: MasterEndpoint::new(),
            timeout: default_timeout(),
            connect_timeout: None,
            transport: None,
            tls_domain: None,
            ca_certificate: None,
            log_level: default_log_level(),
            log_format: OutputFormat::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from `config/discovery.toml` and the environment
    ///
    /// Example: `KUDU_DISCOVERY_MASTER=kudu-master1:7051`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path (missing files are skipped)
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::figment(path).extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// The merged provider chain, exposed for callers that add their own layers.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        match self.transport {
            None => return Err(ConfigError::MissingTransport),
            Some(TransportKind::Insecure)
                if self.tls_domain.is_some() || self.ca_certificate.is_some() =>
            {
                return Err(ConfigError::TlsOptionsWithoutTls);
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Build the channel configuration, reading the CA certificate if one is set.
    pub fn channel_config(&self) -> Result<ChannelConfig, ConfigError> {
        let transport = match self.transport {
            None => return Err(ConfigError::MissingTransport),
            Some(TransportKind::Insecure) => TransportMode::Insecure,
            Some(TransportKind::Tls) => {
                let ca_certificate_pem = match &self.ca_certificate {
                    Some(path) => Some(std::fs::read(path).map_err(|source| {
                        ConfigError::CaCertificate {
                            path: path.clone(),
                            source,
                        }
                    })?),
                    None => None,
                };
                TransportMode::Tls {
                    domain: self.tls_domain.clone(),
                    ca_certificate_pem,
                }
            }
        };

        let mut config = ChannelConfig::new(transport);
        config.connect_timeout = self.connect_timeout;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_defaults_when_file_missing() {
        let config = DiscoveryConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.master.to_string(), "localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert!(config.transport.is_none());
        assert!(matches!(config.validate(), Err(ConfigError::MissingTransport)));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            master = "kudu-master1.node.example:7051"
            timeout = "250ms"
            connect_timeout = "2s"
            transport = "insecure"
            log_level = "debug"
            log_format = "json"
            "#,
        );

        let config = DiscoveryConfig::load_from(file.path()).unwrap();
        assert_eq!(config.master.host(), "kudu-master1.node.example");
        assert_eq!(config.master.port(), 7051);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.transport, Some(TransportKind::Insecure));
        assert_eq!(config.log_format, OutputFormat::Json);
        assert!(config.validate().is_ok());

        let channel = config.channel_config().unwrap();
        assert!(channel.transport.is_insecure());
        assert_eq!(channel.connect_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    #[serial]
    fn test_malformed_master_fails_extraction() {
        let file = write_config(r#"master = "a:b:7051""#);
        let err = DiscoveryConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("a:b:7051"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config(
            r#"
            master = "file-master:7051"
            transport = "insecure"
            "#,
        );
        std::env::set_var("KUDU_DISCOVERY_MASTER", "env-master:7052");
        std::env::set_var("KUDU_DISCOVERY_LOG_LEVEL", "warn");
        let result = DiscoveryConfig::load_from(file.path());
        std::env::remove_var("KUDU_DISCOVERY_MASTER");
        std::env::remove_var("KUDU_DISCOVERY_LOG_LEVEL");

        let config = result.unwrap();
        assert_eq!(config.master.to_string(), "env-master:7052");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_log_level() {
        let config = DiscoveryConfig {
            transport: Some(TransportKind::Insecure),
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn test_tls_options_require_tls() {
        let config = DiscoveryConfig {
            transport: Some(TransportKind::Insecure),
            tls_domain: Some("master.example".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TlsOptionsWithoutTls)
        ));
    }

    #[test]
    fn test_tls_channel_config() {
        let config = DiscoveryConfig {
            transport: Some(TransportKind::Tls),
            tls_domain: Some("master.example".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let channel = config.channel_config().unwrap();
        assert_eq!(
            channel.transport,
            TransportMode::Tls {
                domain: Some("master.example".to_string()),
                ca_certificate_pem: None,
            }
        );
    }

    #[test]
    fn test_missing_ca_certificate_file() {
        let config = DiscoveryConfig {
            transport: Some(TransportKind::Tls),
            ca_certificate: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        };
        assert!(matches!(
            config.channel_config(),
            Err(ConfigError::CaCertificate { .. })
        ));
    }
}
