//! Session state carried by the client itself.
//!
//! Nothing is stored server-side: `read` looks the record up in the raw
//! `Cookie` header of the current request, `write` asks the transport to set
//! a cookie named after the identifier, and removal expires that cookie.

use std::sync::Arc;

use async_trait::async_trait;

use sk_domain::config::CookieOptions;
use sk_domain::error::Result;
use sk_events::{topics, CookieSignal, Dispatcher, Signal, TargetId};

use super::SessionStorage;
use crate::cookie::parse_cookie_header;
use crate::surface::RequestSurface;

pub struct CookieStorage {
    target: TargetId,
    request_cookie_header: String,
    options: CookieOptions,
    bus: Option<Arc<dyn Dispatcher>>,
}

impl CookieStorage {
    pub fn new(options: CookieOptions) -> Self {
        Self {
            target: TargetId::next(),
            request_cookie_header: String::new(),
            options,
            bus: None,
        }
    }

    pub fn with_dispatcher(mut self, bus: Arc<dyn Dispatcher>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Use `header` as the request's raw `Cookie` header.
    pub fn with_request_cookie_header(mut self, header: impl Into<String>) -> Self {
        self.request_cookie_header = header.into();
        self
    }

    fn emit(&self, signal: CookieSignal) {
        match &self.bus {
            Some(bus) => bus.publish(topics::SET_COOKIE, self.target, &Signal::Cookie(signal)),
            None => tracing::warn!(
                cookie = %signal.identifier,
                "cookie session storage has no dispatcher; cookie dropped"
            ),
        }
    }
}

#[async_trait]
impl SessionStorage for CookieStorage {
    fn target(&self) -> TargetId {
        self.target
    }

    fn dispatcher(&self) -> Option<&Arc<dyn Dispatcher>> {
        self.bus.as_ref()
    }

    fn name(&self) -> &'static str {
        "cookie"
    }

    async fn read(&self, identifier: &str) -> Result<Option<String>> {
        Ok(parse_cookie_header(&self.request_cookie_header).remove(identifier))
    }

    async fn write(&self, identifier: &str, data: &str) -> Result<()> {
        self.emit(CookieSignal {
            identifier: identifier.to_owned(),
            data: data.to_owned(),
            options: Some(self.options.clone()),
        });
        Ok(())
    }

    async fn remove(&self, identifier: &str) -> Result<()> {
        self.emit(CookieSignal {
            identifier: identifier.to_owned(),
            data: String::new(),
            options: Some(self.options.expired()),
        });
        Ok(())
    }

    /// A fresh instance bound to this request's cookies, with its own
    /// target so concurrent requests never see each other's cookies.
    fn for_request(self: Arc<Self>, request: &dyn RequestSurface) -> Arc<dyn SessionStorage> {
        Arc::new(Self {
            target: TargetId::next(),
            request_cookie_header: request.raw_cookie_header().unwrap_or_default().to_owned(),
            options: self.options.clone(),
            bus: self.bus.clone(),
        })
    }
}
