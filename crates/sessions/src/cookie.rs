//! `Cookie` request-header parsing and `Set-Cookie` serialization.
//!
//! Values are percent-encoded on the way out and decoded on the way in only
//! when they contain `%`, so plain tokens round-trip untouched.

use std::collections::HashMap;

use sk_domain::config::CookieOptions;

/// Parse a raw `Cookie` header into name → value.  The first occurrence of a
/// name wins; malformed pairs are skipped.
pub fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in raw.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || cookies.contains_key(name) {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        let value = if value.contains('%') {
            urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_owned())
        } else {
            value.to_owned()
        };
        cookies.insert(name.to_owned(), value);
    }
    cookies
}

/// Build a `Set-Cookie` header value.
pub fn serialize_cookie(name: &str, value: &str, options: Option<&CookieOptions>) -> String {
    let mut out = format!("{name}={}", urlencoding::encode(value));
    let Some(opts) = options else {
        return out;
    };

    if let Some(max_age) = opts.max_age {
        out.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(domain) = &opts.domain {
        out.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &opts.path {
        out.push_str(&format!("; Path={path}"));
    }
    if let Some(expires) = opts.expires {
        out.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    if opts.http_only {
        out.push_str("; HttpOnly");
    }
    if opts.secure {
        out.push_str("; Secure");
    }
    if let Some(same_site) = opts.same_site {
        out.push_str(&format!("; SameSite={}", same_site.as_str()));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use sk_domain::config::SameSite;

    use super::*;

    #[test]
    fn parse_plain_pairs() {
        let cookies = parse_cookie_header("SKSESSID=xyz; theme=dark");
        assert_eq!(cookies.get("SKSESSID").map(String::as_str), Some("xyz"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn parse_first_occurrence_wins_and_skips_garbage() {
        let cookies = parse_cookie_header("a=1; junk; =nameless; a=2");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn parse_decodes_escapes_and_quotes() {
        let cookies = parse_cookie_header(r#"data=%7B%22a%22%3A1%7D; q="quoted"; bad=%zz"#);
        assert_eq!(cookies.get("data").map(String::as_str), Some(r#"{"a":1}"#));
        assert_eq!(cookies.get("q").map(String::as_str), Some("quoted"));
        assert_eq!(cookies.get("bad").map(String::as_str), Some("%zz"));
    }

    #[test]
    fn parse_keeps_escapes_that_are_not_utf8() {
        let cookies = parse_cookie_header("raw=%FF%FE; ok=a%20b");
        assert_eq!(cookies.get("raw").map(String::as_str), Some("%FF%FE"));
        assert_eq!(cookies.get("ok").map(String::as_str), Some("a b"));
    }

    #[test]
    fn serialize_bare_cookie() {
        assert_eq!(serialize_cookie("SKSESSID", "abc123", None), "SKSESSID=abc123");
    }

    #[test]
    fn serialize_encodes_value() {
        assert_eq!(
            serialize_cookie("s", r#"{"a":"b c"}"#, None),
            "s=%7B%22a%22%3A%22b%20c%22%7D"
        );
    }

    #[test]
    fn serialize_with_attributes() {
        let opts = CookieOptions {
            path: Some("/".into()),
            domain: Some("example.com".into()),
            max_age: Some(0),
            expires: Some(DateTime::<Utc>::UNIX_EPOCH),
            http_only: true,
            secure: true,
            same_site: Some(SameSite::Strict),
        };
        assert_eq!(
            serialize_cookie("SKSESSID", "", Some(&opts)),
            "SKSESSID=; Max-Age=0; Domain=example.com; Path=/; \
             Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn encode_then_parse_restores_value() {
        let raw = r#"{"isConnected":true,"name":"Zoë; Doe"}"#;
        let header = serialize_cookie("payload", raw, None);
        let cookies = parse_cookie_header(&header);
        assert_eq!(cookies.get("payload").map(String::as_str), Some(raw));
    }
}
