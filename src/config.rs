//! Configuration for the peerpulse service
//!
//! Settings are layered: built-in defaults, an optional `peerpulse.toml`
//! file, then `PEERPULSE_`-prefixed environment variables. The field
//! encryption secret is not part of that layering: it comes from the
//! `ENCRYPTION_KEY` environment variable and is validated at boot so a
//! misconfigured deployment fails before serving a single request.

use crate::error::{PeerpulseError, Result};
use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

/// Environment variable holding the service master encryption secret
pub const ENCRYPTION_KEY_VAR: &str = "ENCRYPTION_KEY";

/// Minimum length of the master encryption secret, in bytes
pub const MIN_ENCRYPTION_KEY_LEN: usize = 32;

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Bind address, e.g. "127.0.0.1:8080"
    pub addr: String,
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the libSQL database file, or ":memory:" for tests
    pub path: String,
}

/// File/environment-sourced part of the configuration
#[derive(Debug, Clone, Deserialize)]
struct FileSettings {
    server: ServerSettings,
    database: DatabaseSettings,
}

/// Complete service configuration
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    /// Master secret for member-field encryption. Never logged.
    pub encryption_key: SecretString,
}

impl Settings {
    /// Load configuration from defaults, optional config file, and environment
    ///
    /// Fails fast if `ENCRYPTION_KEY` is missing or shorter than
    /// [`MIN_ENCRYPTION_KEY_LEN`] bytes.
    pub fn load() -> Result<Self> {
        let file_settings: FileSettings = Config::builder()
            .set_default("server.addr", "127.0.0.1:8080")?
            .set_default("database.path", "peerpulse.db")?
            .add_source(File::with_name("peerpulse").required(false))
            .add_source(Environment::with_prefix("PEERPULSE").separator("__"))
            .build()?
            .try_deserialize()?;

        let raw_key = std::env::var(ENCRYPTION_KEY_VAR).map_err(|_| {
            PeerpulseError::Config(config::ConfigError::Message(format!(
                "{} environment variable must be set",
                ENCRYPTION_KEY_VAR
            )))
        })?;
        validate_encryption_key(&raw_key)?;

        debug!(
            "Configuration loaded (server: {}, database: {})",
            file_settings.server.addr, file_settings.database.path
        );

        Ok(Self {
            server: file_settings.server,
            database: file_settings.database,
            encryption_key: SecretString::new(raw_key.into()),
        })
    }

    /// Build settings directly, validating the encryption key
    ///
    /// Used by tests and embedded setups that do not read the environment.
    pub fn from_parts(addr: &str, db_path: &str, encryption_key: &str) -> Result<Self> {
        validate_encryption_key(encryption_key)?;
        Ok(Self {
            server: ServerSettings {
                addr: addr.to_string(),
            },
            database: DatabaseSettings {
                path: db_path.to_string(),
            },
            encryption_key: SecretString::new(encryption_key.to_string().into()),
        })
    }

    /// Expose the raw encryption secret for key derivation
    pub fn encryption_key(&self) -> &str {
        self.encryption_key.expose_secret()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The encryption key must never appear in logs or debug output.
        f.debug_struct("Settings")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

/// Validate the master encryption secret
pub fn validate_encryption_key(key: &str) -> Result<()> {
    if key.len() < MIN_ENCRYPTION_KEY_LEN {
        return Err(PeerpulseError::Config(config::ConfigError::Message(
            format!(
                "{} must be at least {} characters (got {})",
                ENCRYPTION_KEY_VAR,
                MIN_ENCRYPTION_KEY_LEN,
                key.len()
            ),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_key_rejected() {
        let err = validate_encryption_key("too-short").unwrap_err();
        assert!(matches!(err, PeerpulseError::Config(_)));
    }

    #[test]
    fn test_minimum_length_key_accepted() {
        let key = "k".repeat(MIN_ENCRYPTION_KEY_LEN);
        assert!(validate_encryption_key(&key).is_ok());
    }

    #[test]
    fn test_from_parts_validates_key() {
        assert!(Settings::from_parts("127.0.0.1:0", ":memory:", "short").is_err());

        let settings =
            Settings::from_parts("127.0.0.1:0", ":memory:", &"x".repeat(40)).unwrap();
        assert_eq!(settings.server.addr, "127.0.0.1:0");
        assert_eq!(settings.encryption_key().len(), 40);
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings =
            Settings::from_parts("127.0.0.1:0", ":memory:", &"x".repeat(40)).unwrap();
        let rendered = format!("{:?}", settings);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("xxxx"));
    }
}
