//! Configuration types for zonegate.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::Error;

/// Top-level configuration.
///
/// The embedding service builds one of these at composition time and passes
/// the relevant sections down; nothing in this crate reads configuration
/// through a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Request authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Request authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether stored account secrets are encrypted at rest.
    ///
    /// When false the principal store already holds plaintext secrets and
    /// the authenticator uses them as-is.
    #[serde(default = "default_encrypt_user_secrets")]
    pub encrypt_user_secrets: bool,

    /// Which crypto algebra encrypts secrets and TSIG keys at rest.
    #[serde(default)]
    pub crypto: CryptoConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            encrypt_user_secrets: default_encrypt_user_secrets(),
            crypto: CryptoConfig::default(),
        }
    }
}

fn default_encrypt_user_secrets() -> bool {
    true
}

/// Crypto algebra selection.
///
/// `no-op` is intended for test configurations only; production deployments
/// configure `aes-256-gcm` with a base64-encoded 32-byte key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "algebra", rename_all = "kebab-case")]
pub enum CryptoConfig {
    /// Identity algebra (secrets stored as-is).
    #[default]
    NoOp,
    /// AES-256-GCM with the given base64-encoded key.
    Aes256Gcm {
        /// Base64-encoded 32-byte key.
        key: String,
    },
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "zonegate=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads configuration from a TOML file with a `ZONEGATE`-prefixed
    /// environment overlay (e.g. `ZONEGATE__AUTH__ENCRYPT_USER_SECRETS`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ZONEGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        if let CryptoConfig::Aes256Gcm { key } = &self.auth.crypto {
            let raw = BASE64
                .decode(key)
                .map_err(|_| Error::Config("auth.crypto.key is not base64".to_string()))?;
            if raw.len() != 32 {
                return Err(Error::Config(format!(
                    "auth.crypto.key must decode to 32 bytes, got {}",
                    raw.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let auth = AuthConfig::default();
        assert!(auth.encrypt_user_secrets);
        assert!(matches!(auth.crypto, CryptoConfig::NoOp));

        let telemetry = TelemetryConfig::default();
        assert_eq!(telemetry.log_level, "info");
        assert!(telemetry.prometheus_addr.is_none());
    }

    #[test]
    fn test_validate_rejects_short_aes_key() {
        let config = Config {
            auth: AuthConfig {
                encrypt_user_secrets: true,
                crypto: CryptoConfig::Aes256Gcm {
                    key: BASE64.encode([0u8; 16]),
                },
            },
            telemetry: TelemetryConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_base64_key() {
        let config = Config {
            auth: AuthConfig {
                encrypt_user_secrets: true,
                crypto: CryptoConfig::Aes256Gcm {
                    key: "not base64!".to_string(),
                },
            },
            telemetry: TelemetryConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_crypto_config_toml_shape() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [auth]
                encrypt_user_secrets = false

                [auth.crypto]
                algebra = "no-op"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(!config.auth.encrypt_user_secrets);
        assert!(matches!(config.auth.crypto, CryptoConfig::NoOp));
    }
}
