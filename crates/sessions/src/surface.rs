//! The request/response boundary the session hook talks to.
//!
//! Transports (axum, hyper, tests) adapt their own types to these traits;
//! nothing in this crate touches raw HTTP.

use std::collections::HashMap;

use sk_events::CookieSignal;

use crate::cookie::{parse_cookie_header, serialize_cookie};

/// Read access to an inbound request.
pub trait RequestSurface: Send + Sync {
    fn cookie(&self, name: &str) -> Option<&str>;
    /// Header lookup; names are case-insensitive.
    fn header(&self, name: &str) -> Option<&str>;
    fn query(&self, name: &str) -> Option<&str>;
    /// The unparsed `Cookie` header, if any.
    fn raw_cookie_header(&self) -> Option<&str>;
}

/// Header access on an outgoing response.
pub trait ResponseSurface: Send {
    fn header(&self, name: &str) -> Option<String>;
    /// Replace every value of `name` with `value`.
    fn set_header(&mut self, name: &str, value: &str);
    fn append_header(&mut self, name: &str, value: &str);

    fn append_cookie(&mut self, cookie: &CookieSignal) {
        let value = serialize_cookie(&cookie.identifier, &cookie.data, cookie.options.as_ref());
        self.append_header("set-cookie", &value);
    }
}

/// Owned snapshot of the parts of a request the session layer reads.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    raw_cookie: Option<String>,
    cookies: HashMap<String, String>,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl RequestView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw `Cookie` header and parse it.
    pub fn with_cookie_header(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.cookies = parse_cookie_header(&raw);
        self.raw_cookie = Some(raw);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Parse an `a=1&b=2` query string.  The first occurrence of a key wins.
    pub fn with_query(mut self, raw: &str) -> Self {
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_query_component(key);
            let value = decode_query_component(value);
            self.query.entry(key).or_insert(value);
        }
        self
    }
}

fn decode_query_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

impl RequestSurface for RequestView {
    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    fn raw_cookie_header(&self) -> Option<&str> {
        self.raw_cookie.as_deref()
    }
}

/// Owned response headers, for transports that build the response after the
/// fact and for tests.  Names are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseView {
    headers: Vec<(String, String)>,
}

impl ResponseView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value of `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl ResponseSurface for ResponseView {
    fn header(&self, name: &str) -> Option<String> {
        self.get_all(name).first().map(|v| v.to_string())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value.to_owned()));
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_ascii_lowercase(), value.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive() {
        let view = RequestView::new().with_header("X-Session", "abc");
        assert_eq!(view.header("x-session"), Some("abc"));
        assert_eq!(view.header("X-SESSION"), Some("abc"));
    }

    #[test]
    fn query_is_decoded() {
        let view = RequestView::new().with_query("SKSESSID=a%2Fb&name=John+Doe&flag");
        assert_eq!(view.query("SKSESSID"), Some("a/b"));
        assert_eq!(view.query("name"), Some("John Doe"));
        assert_eq!(view.query("flag"), Some(""));
        assert_eq!(view.query("missing"), None);
    }

    #[test]
    fn cookie_header_is_kept_raw_and_parsed() {
        let view = RequestView::new().with_cookie_header("SKSESSID=xyz; other=1");
        assert_eq!(view.raw_cookie_header(), Some("SKSESSID=xyz; other=1"));
        assert_eq!(view.cookie("SKSESSID"), Some("xyz"));
    }

    #[test]
    fn set_header_replaces_and_append_accumulates() {
        let mut response = ResponseView::new();
        response.append_header("Set-Cookie", "a=1");
        response.append_header("set-cookie", "b=2");
        response.set_header("Cache-Control", "no-store");
        response.set_header("cache-control", "private");

        assert_eq!(response.get_all("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(response.header("CACHE-CONTROL").as_deref(), Some("private"));
        assert_eq!(response.get_all("cache-control").len(), 1);
    }

    #[test]
    fn append_cookie_serializes() {
        let mut response = ResponseView::new();
        response.append_cookie(&CookieSignal {
            identifier: "SKSESSID".into(),
            data: "abc123".into(),
            options: None,
        });
        assert_eq!(response.header("set-cookie").as_deref(), Some("SKSESSID=abc123"));
    }
}
