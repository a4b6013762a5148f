//! Per-request session resolution.
//!
//! For every request the manager picks the storage, serializer and exchanger
//! (explicit override, else its defaults), forwards their cookie and header
//! signals to the new session's target, resolves or mints the identifier,
//! runs garbage collection when the storage supports it, and hands back an
//! unloaded [`Session`].

use std::sync::Arc;
use std::time::Duration;

use sk_domain::config::{ExchangerConfig, SessionsConfig, StorageConfig};
use sk_domain::error::Result;
use sk_domain::trace::{id_hint, TraceEvent};
use sk_events::{topics, Dispatcher, EventBus, Runner, Signal, SubscriptionSet, TargetId};

use crate::exchanger::{HttpExchanger, IdentifierExchanger, TokenGenerator};
use crate::serializer::{JsonSerializer, SessionSerializer};
use crate::session::Session;
use crate::storage::{CookieStorage, FileStorage, MemoryStorage, RedisStorage, SessionStorage};
use crate::surface::RequestSurface;

/// Per-call overrides of the manager's defaults.
#[derive(Clone, Default)]
pub struct SessionOptions {
    pub storage: Option<Arc<dyn SessionStorage>>,
    pub serializer: Option<Arc<dyn SessionSerializer>>,
    /// Used as-is, so it should not be shared between concurrent requests.
    pub exchanger: Option<Arc<dyn IdentifierExchanger>>,
}

pub struct SessionManager {
    bus: Arc<dyn Dispatcher>,
    storage: Arc<dyn SessionStorage>,
    serializer: Arc<dyn SessionSerializer>,
    exchanger: ExchangerConfig,
    generator: Option<TokenGenerator>,
}

impl SessionManager {
    /// `storage` should publish on `bus`, otherwise its signals never reach
    /// the session.
    pub fn new(bus: Arc<dyn Dispatcher>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            bus,
            storage,
            serializer: Arc::new(JsonSerializer),
            exchanger: ExchangerConfig::default(),
            generator: None,
        }
    }

    /// Build the bus and the configured backend.
    pub fn from_config(config: &SessionsConfig) -> Result<Self> {
        let bus: Arc<dyn Dispatcher> = Arc::new(EventBus::new());
        let storage: Arc<dyn SessionStorage> = match &config.storage {
            StorageConfig::Memory => Arc::new(MemoryStorage::new().with_dispatcher(bus.clone())),
            StorageConfig::File { path, ttl_secs } => Arc::new(
                FileStorage::new(path, Duration::from_secs(*ttl_secs))?
                    .with_durability(config.durability)
                    .with_dispatcher(bus.clone()),
            ),
            StorageConfig::Cookie => Arc::new(
                CookieStorage::new(config.exchanger.cookie.clone()).with_dispatcher(bus.clone()),
            ),
            StorageConfig::Redis {
                url,
                key_prefix,
                ttl_secs,
            } => Arc::new(
                RedisStorage::new(url, key_prefix.clone(), Duration::from_secs(*ttl_secs))?
                    .with_durability(config.durability)
                    .with_dispatcher(bus.clone()),
            ),
        };

        tracing::info!(
            storage = storage.name(),
            mode = ?config.exchanger.mode,
            durability = ?config.durability,
            "session manager ready"
        );

        Ok(Self::new(bus, storage).with_exchanger_config(config.exchanger.clone()))
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn SessionSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_exchanger_config(mut self, config: ExchangerConfig) -> Self {
        self.exchanger = config;
        self
    }

    pub fn with_token_generator(mut self, generator: TokenGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn bus(&self) -> &Arc<dyn Dispatcher> {
        &self.bus
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// A new exchanger with its own target, publishing on the manager's bus.
    pub fn exchanger(&self) -> HttpExchanger {
        let exchanger = HttpExchanger::new(self.exchanger.clone()).with_dispatcher(self.bus.clone());
        match &self.generator {
            Some(generator) => exchanger.with_generator(generator.clone()),
            None => exchanger,
        }
    }

    pub async fn get(&self, request: &dyn RequestSurface, options: SessionOptions) -> Result<Session> {
        self.get_as(TargetId::next(), request, options).await
    }

    /// Like [`get`](Self::get), with the session's target chosen by the
    /// caller.  Listening on `target` before calling this observes the
    /// signals raised while the identifier is minted.
    pub async fn get_as(
        &self,
        target: TargetId,
        request: &dyn RequestSurface,
        options: SessionOptions,
    ) -> Result<Session> {
        let storage = options
            .storage
            .unwrap_or_else(|| self.storage.clone())
            .for_request(request);
        let serializer = options
            .serializer
            .unwrap_or_else(|| self.serializer.clone());
        let exchanger: Arc<dyn IdentifierExchanger> = match options.exchanger {
            Some(exchanger) => exchanger,
            None => Arc::new(self.exchanger()),
        };

        let mut wiring = SubscriptionSet::new(self.bus.clone());
        for event in [topics::SET_COOKIE, topics::SET_HEADER] {
            wiring.forward(event, storage.target(), target);
            wiring.forward(event, exchanger.target(), target);
        }

        let (identifier, is_new) = match exchanger.resolve_identifier(request) {
            Some(identifier) => (identifier, false),
            None => (exchanger.mint_identifier(), true),
        };

        wiring.subscribe(
            topics::DESTROY,
            storage.target(),
            invalidate_on_destroy(identifier.clone(), exchanger),
        );

        TraceEvent::SessionResolved {
            id_hint: id_hint(&identifier),
            is_new,
        }
        .emit();

        if let Some(expirable) = storage.expirable() {
            match expirable.gc().await {
                Ok(removed) => tracing::debug!(storage = storage.name(), removed, "session gc pass"),
                Err(e) => tracing::warn!(storage = storage.name(), error = %e, "session gc failed"),
            }
        }

        Ok(Session::wired(
            identifier,
            target,
            is_new,
            storage,
            serializer,
            Some(wiring),
        ))
    }

    /// One garbage-collection pass over the default storage.  Storage without
    /// expiry reports zero.
    pub async fn collect_garbage(&self) -> Result<usize> {
        match self.storage.expirable() {
            Some(expirable) => expirable.gc().await,
            None => Ok(0),
        }
    }
}

/// Tell `exchanger` to drop the client's identifier once the storage destroys
/// the record it names.
///
/// Shared storages publish `destroy` under one target for every request, so
/// a concurrent request destroying its own record reaches this listener too.
/// Only a destroy of this session's identifier invalidates; each such destroy
/// invalidates exactly once.
fn invalidate_on_destroy(identifier: String, exchanger: Arc<dyn IdentifierExchanger>) -> Runner {
    Runner::new(move |_, _, signal| {
        if let Signal::Destroy(destroyed) = signal {
            if destroyed.identifier == identifier {
                exchanger.invalidate_identifier(&identifier);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;
    use sk_domain::config::ExchangeMode;
    use sk_events::{run_scoped, CookieSignal, EventBus, ListenerSpec};

    use super::*;
    use crate::surface::RequestView;

    fn fixed(id: &'static str) -> TokenGenerator {
        Arc::new(move || id.to_string())
    }

    fn memory_manager() -> (SessionManager, Arc<MemoryStorage>) {
        let bus: Arc<dyn Dispatcher> = Arc::new(EventBus::new());
        let storage = Arc::new(MemoryStorage::new().with_dispatcher(bus.clone()));
        let manager =
            SessionManager::new(bus, storage.clone()).with_token_generator(fixed("abc123"));
        (manager, storage)
    }

    fn cookie_recorder(target: TargetId) -> (ListenerSpec, Arc<Mutex<Vec<CookieSignal>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let spec = ListenerSpec::new(
            topics::SET_COOKIE,
            target,
            Runner::new(move |_, _, signal| {
                if let Signal::Cookie(c) = signal {
                    sink.lock().push(c.clone());
                }
            }),
        );
        (spec, seen)
    }

    #[tokio::test]
    async fn presented_identifier_is_reused() {
        let (manager, _) = memory_manager();
        let request = RequestView::new().with_cookie_header("SKSESSID=existing");
        let session = manager.get(&request, SessionOptions::default()).await.unwrap();
        assert_eq!(session.identifier(), "existing");
        assert!(!session.is_new());
    }

    #[tokio::test]
    async fn minted_identifier_is_announced_as_the_session() {
        let (manager, _) = memory_manager();
        let target = TargetId::next();
        let (spec, seen) = cookie_recorder(target);

        let session = run_scoped(manager.bus().as_ref(), &[spec], async {
            manager
                .get_as(target, &RequestView::new(), SessionOptions::default())
                .await
        })
        .await
        .unwrap();

        assert_eq!(session.identifier(), "abc123");
        assert!(session.is_new());
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].identifier, "SKSESSID");
        assert_eq!(seen[0].data, "abc123");
    }

    #[tokio::test]
    async fn destroying_the_record_invalidates_the_identifier() {
        let (manager, _) = memory_manager();
        let request = RequestView::new().with_cookie_header("SKSESSID=existing");
        let mut session = manager.get(&request, SessionOptions::default()).await.unwrap();
        let (spec, seen) = cookie_recorder(session.target());

        run_scoped(manager.bus().as_ref(), &[spec], session.destroy())
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].identifier, "SKSESSID");
        assert_eq!(seen[0].options.as_ref().and_then(|o| o.max_age), Some(0));
    }

    #[tokio::test]
    async fn destroying_another_record_leaves_the_identifier_alone() {
        let (manager, storage) = memory_manager();
        let request = RequestView::new().with_cookie_header("SKSESSID=existing");
        let session = manager.get(&request, SessionOptions::default()).await.unwrap();
        let (spec, seen) = cookie_recorder(session.target());

        run_scoped(manager.bus().as_ref(), &[spec], storage.destroy("someone-else"))
            .await
            .unwrap();

        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn wiring_is_released_with_the_session() {
        let bus = Arc::new(EventBus::new());
        let storage = Arc::new(MemoryStorage::new().with_dispatcher(bus.clone()));
        let manager = SessionManager::new(bus.clone(), storage);

        for _ in 0..3 {
            let session = manager
                .get(&RequestView::new(), SessionOptions::default())
                .await
                .unwrap();
            assert!(bus.listener_count() > 0);
            drop(session);
        }
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn override_storage_wins() {
        let (manager, default_storage) = memory_manager();
        let other = Arc::new(MemoryStorage::new().with_dispatcher(manager.bus().clone()));
        other.write("abc123", r#"{"from":"override"}"#).await.unwrap();

        let options = SessionOptions {
            storage: Some(other.clone()),
            ..SessionOptions::default()
        };
        let mut session = manager.get(&RequestView::new(), options).await.unwrap();
        session.start().await.unwrap();

        assert_eq!(session.get("from"), Some(&json!("override")));
        assert!(default_storage.is_empty());
    }

    #[tokio::test]
    async fn resolution_collects_expired_file_records() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SessionsConfig {
            storage: StorageConfig::File {
                path: tmp.path().to_path_buf(),
                ttl_secs: 60,
            },
            ..SessionsConfig::default()
        };
        let manager = SessionManager::from_config(&config).unwrap();
        std::fs::write(tmp.path().join("stale"), "{}").unwrap();
        std::fs::File::options()
            .write(true)
            .open(tmp.path().join("stale"))
            .unwrap()
            .set_modified(std::time::SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        manager
            .get(&RequestView::new(), SessionOptions::default())
            .await
            .unwrap();

        assert!(!tmp.path().join("stale").exists());
    }

    #[tokio::test]
    async fn header_mode_mints_through_a_header() {
        let (manager, _) = memory_manager();
        let manager = manager.with_exchanger_config(ExchangerConfig {
            mode: ExchangeMode::Header,
            ..ExchangerConfig::default()
        });
        let request = RequestView::new().with_header("sksessid", "fromheader");
        let session = manager.get(&request, SessionOptions::default()).await.unwrap();
        assert_eq!(session.identifier(), "fromheader");
    }

    #[tokio::test]
    async fn memory_has_no_garbage_to_collect() {
        let (manager, _) = memory_manager();
        assert_eq!(manager.collect_garbage().await.unwrap(), 0);
    }
}
