//! The request hook: load a session around a handler, then commit it.
//!
//! Two listening windows are opened on the session's target, one while the
//! session is resolved and loaded and one while it is saved.  Every cookie
//! and header signal raised inside them is collected in order and applied to
//! the response once, after the save.  A handler that fails skips the commit
//! entirely, so its session changes are dropped.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use sk_domain::config::SessionsConfig;
use sk_domain::error::{Error, Result};
use sk_domain::trace::{id_hint, TraceEvent};
use sk_events::{
    run_scoped, topics, CookieSignal, HeaderSignal, ListenerSpec, Runner, Signal, TargetId,
};

use crate::handle::SessionHandle;
use crate::manager::{SessionManager, SessionOptions};
use crate::serializer::SessionData;
use crate::session::Session;
use crate::surface::{RequestSurface, ResponseSurface};

pub const DEFAULT_MARKER_HEADER: &str = "x-sksession";

#[derive(Debug, Default)]
struct Collected {
    cookies: Vec<CookieSignal>,
    headers: Vec<HeaderSignal>,
}

impl Collected {
    fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.headers.is_empty()
    }
}

/// A loaded session waiting for its handler to finish.
pub struct OpenSession {
    session: Session,
    handle: SessionHandle,
    collected: Arc<Mutex<Collected>>,
}

impl OpenSession {
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

pub struct SessionHook {
    manager: Arc<SessionManager>,
    marker_header: String,
    reset_corrupt: bool,
}

impl SessionHook {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            marker_header: DEFAULT_MARKER_HEADER.to_owned(),
            reset_corrupt: false,
        }
    }

    pub fn from_config(config: &SessionsConfig) -> Result<Self> {
        let manager = SessionManager::from_config(config)?;
        Ok(Self::new(Arc::new(manager))
            .with_marker_header(config.marker_header.clone())
            .with_reset_corrupt(config.reset_corrupt))
    }

    pub fn with_marker_header(mut self, name: impl Into<String>) -> Self {
        self.marker_header = name.into();
        self
    }

    /// Start an empty session when the stored payload cannot be decoded,
    /// instead of failing.
    pub fn with_reset_corrupt(mut self, reset: bool) -> Self {
        self.reset_corrupt = reset;
        self
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub async fn open(&self, request: &dyn RequestSurface) -> Result<OpenSession> {
        self.open_with(request, SessionOptions::default()).await
    }

    /// Resolve and load the session for `request`.
    pub async fn open_with(
        &self,
        request: &dyn RequestSurface,
        options: SessionOptions,
    ) -> Result<OpenSession> {
        let target = TargetId::next();
        let collected = Arc::new(Mutex::new(Collected::default()));
        let listeners = collectors(target, &collected);

        let load = async {
            let mut session = self.manager.get_as(target, request, options).await?;
            match session.start().await {
                Ok(()) => {}
                Err(e @ (Error::Json(_) | Error::CorruptSession(_))) if self.reset_corrupt => {
                    tracing::warn!(
                        id = %id_hint(session.identifier()),
                        error = %e,
                        "discarding undecodable session"
                    );
                    session.replace(SessionData::new());
                }
                Err(e) => return Err(e),
            }
            Ok::<_, Error>(session)
        };
        let session = run_scoped(self.manager.bus().as_ref(), &listeners, load).await?;

        let handle = SessionHandle::new(
            session.identifier(),
            session.is_new(),
            session.all().clone(),
        );
        Ok(OpenSession {
            session,
            handle,
            collected,
        })
    }

    /// Save (or destroy) the session and apply every collected signal to
    /// `response`.
    pub async fn commit(&self, open: OpenSession, response: &mut dyn ResponseSurface) -> Result<()> {
        let OpenSession {
            mut session,
            handle,
            collected,
        } = open;
        let listeners = collectors(session.target(), &collected);

        let persist = async {
            if handle.is_destroyed() {
                session.destroy().await
            } else {
                session.replace(handle.take_data());
                session.save().await
            }
        };
        run_scoped(self.manager.bus().as_ref(), &listeners, persist).await?;

        let collected = std::mem::take(&mut *collected.lock());
        self.apply(collected, response);
        Ok(())
    }

    /// Open the session, run `handler`, and commit when it succeeds.  A
    /// handler error is returned unchanged and nothing is saved.
    pub async fn handle<F, Fut, R, E>(
        &self,
        request: &dyn RequestSurface,
        handler: F,
    ) -> std::result::Result<R, E>
    where
        F: FnOnce(SessionHandle) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        R: ResponseSurface,
        E: From<Error>,
    {
        let open = self.open(request).await?;
        let mut response = handler(open.handle.clone()).await?;
        self.commit(open, &mut response).await?;
        Ok(response)
    }

    fn apply(&self, collected: Collected, response: &mut dyn ResponseSurface) {
        if collected.is_empty() {
            return;
        }
        for cookie in &collected.cookies {
            response.append_cookie(cookie);
        }
        for header in &collected.headers {
            response.append_header(&header.identifier, &header.data);
        }

        let cache_control = merge_cache_control(response.header("cache-control").as_deref());
        response.set_header("cache-control", &cache_control);
        response.set_header(&self.marker_header, "true");

        TraceEvent::SignalsApplied {
            cookies: collected.cookies.len(),
            headers: collected.headers.len(),
        }
        .emit();
    }
}

fn collectors(target: TargetId, collected: &Arc<Mutex<Collected>>) -> Vec<ListenerSpec> {
    let sink = collected.clone();
    let on_signal = Runner::new(move |_, _, signal| match signal {
        Signal::Cookie(c) => sink.lock().cookies.push(c.clone()),
        Signal::Header(h) => sink.lock().headers.push(h.clone()),
        Signal::Destroy(_) => {}
    });
    vec![
        ListenerSpec::new(topics::SET_COOKIE, target, on_signal.clone()),
        ListenerSpec::new(topics::SET_HEADER, target, on_signal),
    ]
}

/// Existing directives plus `private`, de-duplicated.  `public` is dropped
/// since it contradicts `private`.
fn merge_cache_control(existing: Option<&str>) -> String {
    let mut directives: Vec<&str> = Vec::new();
    for directive in existing.unwrap_or_default().split(',').map(str::trim) {
        if directive.is_empty() || directive.eq_ignore_ascii_case("public") {
            continue;
        }
        if !directives.iter().any(|d| d.eq_ignore_ascii_case(directive)) {
            directives.push(directive);
        }
    }
    if !directives.iter().any(|d| d.eq_ignore_ascii_case("private")) {
        directives.push("private");
    }
    directives.join(", ")
}
