mod server;
mod sessions;

pub use server::*;
pub use sessions::*;

use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

/// RFC 7230 `token`, which is what cookie and header names must be.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        let sessions = &self.sessions;
        if !is_token(&sessions.exchanger.data_name) {
            errors.push(ConfigError::error(
                "sessions.exchanger.data_name",
                "must be a non-empty cookie/header token",
            ));
        }
        if !is_token(&sessions.marker_header) {
            errors.push(ConfigError::error(
                "sessions.marker_header",
                "must be a non-empty header name",
            ));
        }

        let cookie = &sessions.exchanger.cookie;
        if cookie.same_site == Some(SameSite::None) && !cookie.secure {
            errors.push(ConfigError::warning(
                "sessions.exchanger.cookie.same_site",
                "browsers reject SameSite=None cookies without Secure",
            ));
        }

        match &sessions.storage {
            StorageConfig::File { path, ttl_secs } => {
                if path.as_os_str().is_empty() {
                    errors.push(ConfigError::error("sessions.storage.path", "path must not be empty"));
                }
                if *ttl_secs == 0 {
                    errors.push(ConfigError::warning(
                        "sessions.storage.ttl_secs",
                        "0 expires every session on the next request",
                    ));
                }
            }
            StorageConfig::Redis {
                url,
                key_prefix,
                ttl_secs,
            } => {
                if url.is_empty() {
                    errors.push(ConfigError::error("sessions.storage.url", "url must not be empty"));
                }
                if key_prefix.is_empty() {
                    errors.push(ConfigError::warning(
                        "sessions.storage.key_prefix",
                        "empty prefix mixes session keys with the rest of the keyspace",
                    ));
                }
                if *ttl_secs == 0 {
                    errors.push(ConfigError::warning(
                        "sessions.storage.ttl_secs",
                        "0 is raised to the 1 second minimum",
                    ));
                }
            }
            StorageConfig::Memory | StorageConfig::Cookie => {}
        }

        errors
    }
}
