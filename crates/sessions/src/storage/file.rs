//! One file per session under a configured directory.
//!
//! The file name is the identifier and the content is the serialized
//! session.  Only well-formed identifiers ever become paths.  A record is
//! collected once its modification time is more than `ttl` in the past.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use sk_domain::config::Durability;
use sk_domain::error::{Error, Result};
use sk_domain::trace::{id_hint, TraceEvent};
use sk_events::{Dispatcher, TargetId};

use super::{is_well_formed_identifier, settle, Expirable, SessionStorage};
use crate::surface::RequestSurface;

pub struct FileStorage {
    target: TargetId,
    dir: PathBuf,
    ttl: Duration,
    durability: Durability,
    bus: Option<Arc<dyn Dispatcher>>,
}

impl FileStorage {
    /// Open (creating if needed) the session directory.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        tracing::info!(
            path = %dir.display(),
            ttl_secs = ttl.as_secs(),
            "file session storage ready"
        );

        Ok(Self {
            target: TargetId::next(),
            dir,
            ttl,
            durability: Durability::default(),
            bus: None,
        })
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_dispatcher(mut self, bus: Arc<dyn Dispatcher>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn path(&self, identifier: &str) -> Result<PathBuf> {
        if !is_well_formed_identifier(identifier) {
            return Err(Error::InvalidIdentifier(id_hint(identifier)));
        }
        Ok(self.dir.join(identifier))
    }

    /// Remove every record whose age at `now` exceeds the TTL.
    pub async fn collect_older_than(&self, now: SystemTime) -> Result<usize> {
        let dir = self.dir.clone();
        let ttl = self.ttl;
        tokio::task::spawn_blocking(move || sweep(&dir, ttl, now))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }
}

fn sweep(dir: &Path, ttl: Duration, now: SystemTime) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(Error::Io)? {
        let entry = entry.map_err(Error::Io)?;
        let path = entry.path();

        // Leave anything we did not write alone.
        let is_record = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_well_formed_identifier);
        if !is_record {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable session file");
                continue;
            }
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= ttl {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove expired session file");
            }
        }
    }
    Ok(removed)
}

#[async_trait]
impl SessionStorage for FileStorage {
    fn target(&self) -> TargetId {
        self.target
    }

    fn dispatcher(&self) -> Option<&Arc<dyn Dispatcher>> {
        self.bus.as_ref()
    }

    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self, identifier: &str) -> Result<Option<String>> {
        let Ok(path) = self.path(identifier) else {
            tracing::debug!(id = %id_hint(identifier), "malformed identifier; no session file");
            return Ok(None);
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn write(&self, identifier: &str, data: &str) -> Result<()> {
        let outcome = match self.path(identifier) {
            Ok(path) => tokio::fs::write(&path, data).await.map_err(Error::Io),
            Err(e) => Err(e),
        };
        settle(self.durability, "file", "write", outcome)
    }

    async fn remove(&self, identifier: &str) -> Result<()> {
        let outcome = match self.path(identifier) {
            Ok(path) => match tokio::fs::remove_file(&path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::Io(e)),
                _ => Ok(()),
            },
            Err(e) => Err(e),
        };
        settle(self.durability, "file", "remove", outcome)
    }

    fn expirable(&self) -> Option<&dyn Expirable> {
        Some(self)
    }

    fn for_request(self: Arc<Self>, _request: &dyn RequestSurface) -> Arc<dyn SessionStorage> {
        self
    }
}

#[async_trait]
impl Expirable for FileStorage {
    async fn gc(&self) -> Result<usize> {
        let removed = self.collect_older_than(SystemTime::now()).await?;
        if removed > 0 {
            TraceEvent::SessionsCollected {
                backend: "file".into(),
                removed,
            }
            .emit();
        }
        Ok(removed)
    }
}
