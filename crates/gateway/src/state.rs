use std::sync::Arc;

use sk_domain::config::Config;
use sk_domain::error::Result;
use sk_sessions::SessionHook;

/// Shared application state passed to the middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Loads the session before each request and commits it afterwards.
    pub sessions: Arc<SessionHook>,
}

impl AppState {
    /// Build the session stack described by `config.sessions`.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let sessions = SessionHook::from_config(&config.sessions)?;
        Ok(Self {
            config,
            sessions: Arc::new(sessions),
        })
    }
}
