use serde::{Deserialize, Serialize};

use sk_domain::config::CookieOptions;

/// Event names understood by the session components.
pub mod topics {
    pub const SET_COOKIE: &str = "setCookie";
    pub const SET_HEADER: &str = "setHeader";
    pub const DESTROY: &str = "destroy";
}

/// Ask the transport to set a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSignal {
    /// Cookie name.
    pub identifier: String,
    /// Cookie value.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CookieOptions>,
}

/// Ask the transport to append a response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSignal {
    /// Header name.
    pub identifier: String,
    /// Header value.
    pub data: String,
}

/// A stored record was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroySignal {
    /// Session identifier whose record is gone.
    pub identifier: String,
}

/// Payload carried by a published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    Cookie(CookieSignal),
    Header(HeaderSignal),
    Destroy(DestroySignal),
}

impl Signal {
    /// The event name this payload is normally published under.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Cookie(_) => topics::SET_COOKIE,
            Self::Header(_) => topics::SET_HEADER,
            Self::Destroy(_) => topics::DESTROY,
        }
    }
}

impl From<CookieSignal> for Signal {
    fn from(signal: CookieSignal) -> Self {
        Self::Cookie(signal)
    }
}

impl From<HeaderSignal> for Signal {
    fn from(signal: HeaderSignal) -> Self {
        Self::Header(signal)
    }
}

impl From<DestroySignal> for Signal {
    fn from(signal: DestroySignal) -> Self {
        Self::Destroy(signal)
    }
}
