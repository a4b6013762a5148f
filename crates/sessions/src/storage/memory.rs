use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use sk_domain::error::Result;
use sk_events::{Dispatcher, TargetId};

use super::SessionStorage;
use crate::surface::RequestSurface;

/// Process-local session storage.  No expiry; everything is lost on restart.
pub struct MemoryStorage {
    target: TargetId,
    records: RwLock<HashMap<String, String>>,
    bus: Option<Arc<dyn Dispatcher>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            target: TargetId::next(),
            records: RwLock::new(HashMap::new()),
            bus: None,
        }
    }

    pub fn with_dispatcher(mut self, bus: Arc<dyn Dispatcher>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    fn target(&self) -> TargetId {
        self.target
    }

    fn dispatcher(&self) -> Option<&Arc<dyn Dispatcher>> {
        self.bus.as_ref()
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, identifier: &str) -> Result<Option<String>> {
        Ok(self.records.read().get(identifier).cloned())
    }

    async fn write(&self, identifier: &str, data: &str) -> Result<()> {
        self.records
            .write()
            .insert(identifier.to_owned(), data.to_owned());
        Ok(())
    }

    async fn remove(&self, identifier: &str) -> Result<()> {
        self.records.write().remove(identifier);
        Ok(())
    }

    fn for_request(self: Arc<Self>, _request: &dyn RequestSurface) -> Arc<dyn SessionStorage> {
        self
    }
}
