use std::sync::Arc;

use serde_json::Value;

use sk_domain::error::Result;
use sk_domain::trace::{id_hint, TraceEvent};
use sk_events::{topics, SubscriptionSet, TargetId};

use crate::serializer::{SessionData, SessionSerializer};
use crate::storage::SessionStorage;

/// One identifier bound to one storage backend and one serializer.
///
/// Data is only read from storage by [`start`](Self::start) and only written
/// by [`save`](Self::save); everything in between is in-memory.  Cookie and
/// header signals raised by the storage (and, when built by the manager, the
/// exchanger) are forwarded so they appear to come from [`target`](Self::target).
pub struct Session {
    identifier: String,
    target: TargetId,
    is_new: bool,
    data: SessionData,
    storage: Arc<dyn SessionStorage>,
    serializer: Arc<dyn SessionSerializer>,
    // Unregistered when the session is dropped.
    _wiring: Option<SubscriptionSet>,
}

impl Session {
    pub fn new(
        identifier: impl Into<String>,
        storage: Arc<dyn SessionStorage>,
        serializer: Arc<dyn SessionSerializer>,
    ) -> Self {
        let target = TargetId::next();
        let wiring = storage.dispatcher().map(|bus| {
            let mut wiring = SubscriptionSet::new(bus.clone());
            for event in [topics::SET_COOKIE, topics::SET_HEADER] {
                wiring.forward(event, storage.target(), target);
            }
            wiring
        });
        Self::wired(identifier.into(), target, false, storage, serializer, wiring)
    }

    pub(crate) fn wired(
        identifier: String,
        target: TargetId,
        is_new: bool,
        storage: Arc<dyn SessionStorage>,
        serializer: Arc<dyn SessionSerializer>,
        wiring: Option<SubscriptionSet>,
    ) -> Self {
        Self {
            identifier,
            target,
            is_new,
            data: SessionData::new(),
            storage,
            serializer,
            _wiring: wiring,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Whether the identifier was minted for this request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    // ── persistence ────────────────────────────────────────────────

    /// Replace the in-memory data with what storage holds.  A missing
    /// record yields an empty session; an undecodable one is an error.
    pub async fn start(&mut self) -> Result<()> {
        let raw = self.storage.read(&self.identifier).await?;
        self.data = self.serializer.deserialize(raw.as_deref())?;
        TraceEvent::SessionLoaded {
            id_hint: id_hint(&self.identifier),
            keys: self.data.len(),
        }
        .emit();
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        let raw = self.serializer.serialize(&self.data)?;
        self.storage.write(&self.identifier, &raw).await?;
        TraceEvent::SessionSaved {
            id_hint: id_hint(&self.identifier),
            bytes: raw.len(),
        }
        .emit();
        Ok(())
    }

    /// Drop the stored record and the in-memory data.
    pub async fn destroy(&mut self) -> Result<()> {
        self.data.clear();
        self.storage.destroy(&self.identifier).await
    }

    // ── data ───────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The stored value, or `default` when the key is missing or null.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        match self.data.get(key) {
            Some(Value::Null) | None => default,
            Some(value) => value.clone(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn all(&self) -> &SessionData {
        &self.data
    }

    pub fn replace(&mut self, data: SessionData) {
        self.data = data;
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &id_hint(&self.identifier))
            .field("target", &self.target)
            .field("is_new", &self.is_new)
            .field("keys", &self.data.len())
            .field("storage", &self.storage.name())
            .finish()
    }
}
