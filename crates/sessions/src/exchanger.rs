//! Moving the session identifier between client and server.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;

use sk_domain::config::{ExchangeMode, ExchangerConfig};
use sk_domain::trace::id_hint;
use sk_events::{topics, CookieSignal, Dispatcher, HeaderSignal, Signal, TargetId};

use crate::storage::is_well_formed_identifier;
use crate::surface::RequestSurface;

/// Length of minted identifiers.
pub const TOKEN_LEN: usize = 32;

/// Produces fresh identifiers.
pub type TokenGenerator = Arc<dyn Fn() -> String + Send + Sync>;

pub trait IdentifierExchanger: Send + Sync {
    /// Identity this exchanger publishes signals under.
    fn target(&self) -> TargetId;

    /// The identifier the client presented, if any.  Never mints.
    fn resolve_identifier(&self, request: &dyn RequestSurface) -> Option<String>;

    /// A fresh identifier, announced so the transport can hand it to the
    /// client.
    fn mint_identifier(&self) -> String;

    /// Stop presenting `identifier` to the client, where the mode allows it.
    fn invalidate_identifier(&self, identifier: &str);
}

/// 32 random alphanumeric characters from the thread RNG.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Cookie / header / query exchanger.
pub struct HttpExchanger {
    target: TargetId,
    config: ExchangerConfig,
    bus: Option<Arc<dyn Dispatcher>>,
    generator: TokenGenerator,
}

impl HttpExchanger {
    pub fn new(config: ExchangerConfig) -> Self {
        Self {
            target: TargetId::next(),
            config,
            bus: None,
            generator: Arc::new(generate_token),
        }
    }

    pub fn with_dispatcher(mut self, bus: Arc<dyn Dispatcher>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_generator(mut self, generator: TokenGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &ExchangerConfig {
        &self.config
    }

    fn publish(&self, signal: Signal) {
        if let Some(bus) = &self.bus {
            bus.publish(signal.topic(), self.target, &signal);
        }
    }
}

impl IdentifierExchanger for HttpExchanger {
    fn target(&self) -> TargetId {
        self.target
    }

    fn resolve_identifier(&self, request: &dyn RequestSurface) -> Option<String> {
        let name = self.config.data_name.as_str();
        let presented = match self.config.mode {
            ExchangeMode::Cookie => request.cookie(name),
            ExchangeMode::Header => request.header(name),
            ExchangeMode::Query => request.query(name),
        }?;
        if !is_well_formed_identifier(presented) {
            tracing::debug!(
                id = %id_hint(presented),
                mode = ?self.config.mode,
                "ignoring malformed session identifier"
            );
            return None;
        }
        Some(presented.to_owned())
    }

    fn mint_identifier(&self) -> String {
        let identifier = (self.generator)();
        let name = self.config.data_name.clone();
        match self.config.mode {
            ExchangeMode::Cookie => self.publish(Signal::Cookie(CookieSignal {
                identifier: name,
                data: identifier.clone(),
                options: Some(self.config.cookie.clone()),
            })),
            ExchangeMode::Header => self.publish(Signal::Header(HeaderSignal {
                identifier: name,
                data: identifier.clone(),
            })),
            // The caller surfaces it, e.g. through a redirect.
            ExchangeMode::Query => {}
        }
        identifier
    }

    fn invalidate_identifier(&self, identifier: &str) {
        if self.config.mode != ExchangeMode::Cookie {
            tracing::debug!(
                id = %id_hint(identifier),
                mode = ?self.config.mode,
                "identifier cannot be invalidated from the server in this mode"
            );
            return;
        }
        self.publish(Signal::Cookie(CookieSignal {
            identifier: self.config.data_name.clone(),
            data: String::new(),
            options: Some(self.config.cookie.expired()),
        }));
    }
}
