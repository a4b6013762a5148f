use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session handling configuration: where state lives, how the identifier
/// travels between client and server, and how the response is tagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Storage backend for session records.
    #[serde(default)]
    pub storage: StorageConfig,

    /// What happens when a backend write or delete fails.
    #[serde(default)]
    pub durability: Durability,

    /// Identifier transport (cookie / header / query).
    #[serde(default)]
    pub exchanger: ExchangerConfig,

    /// Header set to `true` on every response that carries session state,
    /// so intermediary caches can recognise it.
    #[serde(default = "d_marker_header")]
    pub marker_header: String,

    /// Start an empty session instead of failing the request when the stored
    /// payload cannot be decoded.
    #[serde(default)]
    pub reset_corrupt: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            durability: Durability::default(),
            exchanger: ExchangerConfig::default(),
            marker_header: d_marker_header(),
            reset_corrupt: false,
        }
    }
}

/// Storage backend selection.  Selected by `kind` in TOML:
///
/// ```toml
/// [sessions.storage]
/// kind = "file"
/// path = "./data/sessions"
/// ttl_secs = 3600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local map.  Lost on restart.
    #[default]
    Memory,
    /// One file per identifier under `path`, collected after `ttl_secs`.
    File {
        path: PathBuf,
        #[serde(default = "d_ttl_secs")]
        ttl_secs: u64,
    },
    /// The serialized session travels in a cookie; nothing is kept server-side.
    Cookie,
    /// Redis / Valkey with server-side expiry.
    Redis {
        url: String,
        #[serde(default = "d_key_prefix")]
        key_prefix: String,
        #[serde(default = "d_ttl_secs")]
        ttl_secs: u64,
    },
}

/// Failure policy for backend writes and deletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Log the failure and carry on; the request is never failed.
    #[default]
    BestEffort,
    /// Return the failure to the caller.
    Awaited,
}

/// Where the session identifier is read from and written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangerConfig {
    /// Cookie, header or query parameter name.
    #[serde(default = "d_data_name")]
    pub data_name: String,

    #[serde(default)]
    pub mode: ExchangeMode,

    /// Options applied to the identifier cookie (cookie mode) and to cookies
    /// written by the cookie storage backend.
    #[serde(default)]
    pub cookie: CookieOptions,
}

impl Default for ExchangerConfig {
    fn default() -> Self {
        Self {
            data_name: d_data_name(),
            mode: ExchangeMode::default(),
            cookie: CookieOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeMode {
    #[default]
    Cookie,
    Header,
    Query,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cookie options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Attributes of a `Set-Cookie` header, passed verbatim to the transport's
/// cookie serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieOptions {
    #[serde(default = "d_cookie_path")]
    pub path: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    /// Seconds.  `Some(0)` expires the cookie immediately.
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default = "d_true")]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: d_cookie_path(),
            domain: None,
            max_age: None,
            expires: None,
            http_only: true,
            secure: false,
            same_site: Some(SameSite::Lax),
        }
    }
}

impl CookieOptions {
    /// The same options, set to expire the cookie immediately
    /// (epoch `Expires`, `Max-Age=0`).
    pub fn expired(&self) -> Self {
        Self {
            max_age: Some(0),
            expires: Some(DateTime::<Utc>::UNIX_EPOCH),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_marker_header() -> String {
    "x-sksession".into()
}
fn d_data_name() -> String {
    "SKSESSID".into()
}
fn d_key_prefix() -> String {
    "sess_".into()
}
fn d_ttl_secs() -> u64 {
    3600
}
fn d_cookie_path() -> Option<String> {
    Some("/".into())
}
fn d_true() -> bool {
    true
}
