//! Session storage backends.
//!
//! Every backend keeps opaque strings keyed by session identifier.  Backends
//! that can expire records expose [`Expirable`] through
//! [`SessionStorage::expirable`]; the manager runs their collection pass
//! whenever it resolves a session.

mod cookie;
mod file;
mod memory;
mod redis_backend;

pub use self::cookie::CookieStorage;
pub use self::file::FileStorage;
pub use self::memory::MemoryStorage;
pub use self::redis_backend::RedisStorage;

use std::sync::Arc;

use async_trait::async_trait;

use sk_domain::config::Durability;
use sk_domain::error::Result;
use sk_domain::trace::{id_hint, TraceEvent};
use sk_events::{topics, DestroySignal, Dispatcher, Signal, TargetId};

use crate::surface::RequestSurface;

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Identity this backend publishes signals under.
    fn target(&self) -> TargetId;

    /// Bus that receives this backend's signals, if any.
    fn dispatcher(&self) -> Option<&Arc<dyn Dispatcher>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Stored record for `identifier`; `None` when there is none.
    async fn read(&self, identifier: &str) -> Result<Option<String>>;

    async fn write(&self, identifier: &str, data: &str) -> Result<()>;

    /// Backend-specific removal, without signalling.
    async fn remove(&self, identifier: &str) -> Result<()>;

    /// Remove the record, then publish `destroy` regardless of the outcome.
    async fn destroy(&self, identifier: &str) -> Result<()> {
        let outcome = self.remove(identifier).await;
        if let Some(bus) = self.dispatcher() {
            bus.publish(
                topics::DESTROY,
                self.target(),
                &Signal::Destroy(DestroySignal {
                    identifier: identifier.to_owned(),
                }),
            );
        }
        TraceEvent::SessionDestroyed {
            backend: self.name().to_owned(),
            id_hint: id_hint(identifier),
        }
        .emit();
        outcome
    }

    /// Expiry capability, when the backend has one.
    fn expirable(&self) -> Option<&dyn Expirable> {
        None
    }

    /// The instance to use for one request.  Backends that read from the
    /// request itself return a bound copy.
    fn for_request(self: Arc<Self>, request: &dyn RequestSurface) -> Arc<dyn SessionStorage>;
}

/// Backends that can drop stale records.
#[async_trait]
pub trait Expirable: Send + Sync {
    /// Remove every record older than the configured TTL.  Returns the number
    /// of records removed.
    async fn gc(&self) -> Result<usize>;
}

/// Apply the durability policy to the outcome of a write or delete.
pub(crate) fn settle(
    durability: Durability,
    backend: &'static str,
    operation: &'static str,
    outcome: Result<()>,
) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(e) if durability == Durability::Awaited => Err(e),
        Err(e) => {
            tracing::warn!(backend, operation, error = %e, "session storage failure ignored");
            TraceEvent::StorageFailure {
                backend: backend.to_owned(),
                operation: operation.to_owned(),
                error: e.to_string(),
            }
            .emit();
            Ok(())
        }
    }
}

/// Identifiers that are safe to use as file names and store keys.
pub fn is_well_formed_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier.len() <= 128
        && identifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use sk_domain::error::Error;

    use super::*;

    #[test]
    fn well_formed_identifiers() {
        assert!(is_well_formed_identifier("abc123"));
        assert!(is_well_formed_identifier("a-b_C"));
        assert!(!is_well_formed_identifier(""));
        assert!(!is_well_formed_identifier("../etc/passwd"));
        assert!(!is_well_formed_identifier("a b"));
        assert!(!is_well_formed_identifier(&"x".repeat(129)));
    }

    #[test]
    fn best_effort_swallows_failures() {
        let failed = Err(Error::Other("disk full".into()));
        assert!(settle(Durability::BestEffort, "file", "write", failed).is_ok());
    }

    #[test]
    fn awaited_surfaces_failures() {
        let failed = Err(Error::Other("disk full".into()));
        assert!(settle(Durability::Awaited, "file", "write", failed).is_err());
    }
}
