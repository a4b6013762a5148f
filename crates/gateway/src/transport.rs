//! Adapters between axum's request/response types and the session surfaces.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;

use sk_sessions::{RequestView, ResponseSurface};

/// Snapshot the headers, cookies and query string of a request.
///
/// Multiple `Cookie` headers (HTTP/2) are joined into one.
pub fn request_view(parts: &Parts) -> RequestView {
    let mut view = RequestView::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            view = view.with_header(name.as_str(), value);
        }
    }

    let cookies: Vec<&str> = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if !cookies.is_empty() {
        view = view.with_cookie_header(cookies.join("; "));
    }

    if let Some(query) = parts.uri.query() {
        view = view.with_query(query);
    }
    view
}

/// Response headers seen through [`ResponseSurface`].
pub struct HeaderSurface<'a>(pub &'a mut HeaderMap);

impl HeaderSurface<'_> {
    fn encode(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => Some((name, value)),
            _ => {
                tracing::warn!(header = %name, "dropping session header that is not valid HTTP");
                None
            }
        }
    }
}

impl ResponseSurface for HeaderSurface<'_> {
    fn header(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = Self::encode(name, value) {
            self.0.insert(name, value);
        }
    }

    fn append_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = Self::encode(name, value) {
            self.0.append(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use sk_sessions::RequestSurface;

    use super::*;

    fn parts(req: Request<Body>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn request_view_reads_every_surface() {
        let parts = parts(
            Request::get("/?SKSESSID=q1&x=1")
                .header("cookie", "SKSESSID=c1")
                .header("cookie", "other=2")
                .header("X-Session", "h1")
                .body(Body::empty())
                .unwrap(),
        );
        let view = request_view(&parts);

        assert_eq!(view.cookie("SKSESSID"), Some("c1"));
        assert_eq!(view.cookie("other"), Some("2"));
        assert_eq!(view.raw_cookie_header(), Some("SKSESSID=c1; other=2"));
        assert_eq!(view.header("x-session"), Some("h1"));
        assert_eq!(view.query("SKSESSID"), Some("q1"));
    }

    #[test]
    fn header_surface_appends_cookies_and_replaces_headers() {
        let mut headers = HeaderMap::new();
        let mut surface = HeaderSurface(&mut headers);
        surface.append_header("set-cookie", "a=1");
        surface.append_header("set-cookie", "b=2");
        surface.set_header("cache-control", "no-store");
        surface.set_header("cache-control", "private");
        surface.set_header("bad header", "x");

        assert_eq!(headers.get_all("set-cookie").iter().count(), 2);
        assert_eq!(headers.get("cache-control").unwrap(), "private");
        assert_eq!(headers.len(), 3);
    }
}
