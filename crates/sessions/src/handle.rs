use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use sk_domain::trace::id_hint;

use crate::serializer::SessionData;

/// The session as seen by a request handler.
///
/// Cheap to clone; every clone shares the same data.  The hook copies the
/// data back into the [`Session`](crate::Session) on commit, or destroys the
/// session if [`destroy`](Self::destroy) was called.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

struct Inner {
    identifier: String,
    is_new: bool,
    data: Mutex<SessionData>,
    destroy: AtomicBool,
}

impl SessionHandle {
    pub fn new(identifier: impl Into<String>, is_new: bool, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Inner {
                identifier: identifier.into(),
                is_new,
                data: Mutex::new(data),
                destroy: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.identifier
    }

    pub fn is_new(&self) -> bool {
        self.inner.is_new
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.data.lock().get(key).cloned()
    }

    /// The stored value, or `default` when the key is missing or null.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        match self.get(key) {
            Some(Value::Null) | None => default,
            Some(value) => value,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.data.lock().insert(key.into(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.data.lock().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.data.lock().remove(key)
    }

    /// Snapshot of the whole mapping.
    pub fn all(&self) -> SessionData {
        self.inner.data.lock().clone()
    }

    pub fn replace(&self, data: SessionData) {
        *self.inner.data.lock() = data;
    }

    pub fn clear(&self) {
        self.inner.data.lock().clear();
    }

    /// Destroy the session instead of saving it when the request completes.
    pub fn destroy(&self) {
        self.inner.data.lock().clear();
        self.inner.destroy.store(true, Ordering::Release);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroy.load(Ordering::Acquire)
    }

    pub(crate) fn take_data(&self) -> SessionData {
        std::mem::take(&mut *self.inner.data.lock())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &id_hint(self.id()))
            .field("is_new", &self.is_new())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn clones_share_data() {
        let handle = SessionHandle::new("abc", true, SessionData::new());
        let other = handle.clone();
        other.set("isConnected", true);
        assert_eq!(handle.get("isConnected"), Some(json!(true)));
        assert!(handle.has("isConnected"));
        assert_eq!(handle.get_or("name", json!("anonymous")), json!("anonymous"));
    }

    #[test]
    fn destroy_clears_and_flags() {
        let handle = SessionHandle::new("abc", false, SessionData::new());
        handle.set("a", 1);
        handle.destroy();
        assert!(handle.is_destroyed());
        assert!(handle.all().is_empty());
    }

    #[test]
    fn debug_does_not_leak_the_identifier() {
        let handle = SessionHandle::new("abcdefghijklmnop", false, SessionData::new());
        let printed = format!("{handle:?}");
        assert!(!printed.contains("abcdefghijklmnop"));
    }
}
