//! Redis / Valkey session storage with server-side expiry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::FromRedisValue;
use tokio::sync::Mutex;

use sk_domain::config::Durability;
use sk_domain::error::{Error, Result};
use sk_events::{Dispatcher, TargetId};

use super::{settle, Expirable, SessionStorage};
use crate::surface::RequestSurface;

pub const DEFAULT_KEY_PREFIX: &str = "sess_";

pub struct RedisStorage {
    target: TargetId,
    client: redis::Client,
    key_prefix: String,
    ttl: Duration,
    durability: Durability,
    bus: Option<Arc<dyn Dispatcher>>,
    // Held across the connect so concurrent first use opens one connection.
    connection: Mutex<ConnectionSlot<MultiplexedConnection>>,
}

/// The cached connection plus a counter bumped on every connect, so a task
/// whose command failed only drops the connection it actually used.
#[derive(Debug)]
struct ConnectionSlot<C> {
    generation: u64,
    conn: Option<C>,
}

impl<C: Clone> ConnectionSlot<C> {
    fn new() -> Self {
        Self {
            generation: 0,
            conn: None,
        }
    }

    fn current(&self) -> Option<(u64, C)> {
        self.conn.as_ref().map(|c| (self.generation, c.clone()))
    }

    fn store(&mut self, conn: C) -> u64 {
        self.generation += 1;
        self.conn = Some(conn);
        self.generation
    }

    /// Forget the connection if it is still the one from `generation`.
    fn clear_if(&mut self, generation: u64) -> bool {
        if self.generation == generation && self.conn.is_some() {
            self.conn = None;
            true
        } else {
            false
        }
    }
}

impl RedisStorage {
    /// Validate `url` and prepare a lazily connected backend.  Nothing touches
    /// the network until the first command.
    pub fn new(url: &str, key_prefix: impl Into<String>, ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("invalid redis url for session storage: {e}")))?;
        Ok(Self {
            target: TargetId::next(),
            client,
            key_prefix: key_prefix.into(),
            ttl,
            durability: Durability::default(),
            bus: None,
            connection: Mutex::new(ConnectionSlot::new()),
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

    /// Store key for `identifier`.
    pub fn key(&self, identifier: &str) -> String {
        format!("{}{}", self.key_prefix, identifier)
    }

    /// Expiry passed to `SET … EX`; never below one second.
    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }

    fn set_cmd(&self, identifier: &str, data: &str) -> redis::Cmd {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(identifier))
            .arg(data)
            .arg("EX")
            .arg(self.ttl_secs());
        cmd
    }

    fn get_cmd(&self, identifier: &str) -> redis::Cmd {
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.key(identifier));
        cmd
    }

    fn del_cmd(&self, identifier: &str) -> redis::Cmd {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(self.key(identifier));
        cmd
    }

    async fn connection(&self) -> Result<(u64, MultiplexedConnection)> {
        let mut slot = self.connection.lock().await;
        if let Some(cached) = slot.current() {
            return Ok(cached);
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Redis(format!("connect: {e}")))?;
        let generation = slot.store(conn.clone());
        tracing::debug!(key_prefix = %self.key_prefix, generation, "redis session storage connected");
        Ok((generation, conn))
    }

    async fn run<T>(&self, operation: &'static str, cmd: redis::Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let (generation, mut conn) = self.connection().await?;
        let result: redis::RedisResult<T> = cmd.query_async(&mut conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                // The next command reconnects, unless another task already did.
                self.connection.lock().await.clear_if(generation);
                tracing::warn!(operation, error = %e, "redis session command failed");
                Err(Error::Redis(format!("{operation}: {e}")))
            }
        }
    }
}

#[async_trait]
impl SessionStorage for RedisStorage {
    fn target(&self) -> TargetId {
        self.target
    }

    fn dispatcher(&self) -> Option<&Arc<dyn Dispatcher>> {
        self.bus.as_ref()
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    async fn read(&self, identifier: &str) -> Result<Option<String>> {
        self.run("get", self.get_cmd(identifier)).await
    }

    async fn write(&self, identifier: &str, data: &str) -> Result<()> {
        let outcome = self.run::<()>("set", self.set_cmd(identifier, data)).await;
        settle(self.durability, "redis", "write", outcome)
    }

    async fn remove(&self, identifier: &str) -> Result<()> {
        let outcome = self
            .run::<i64>("del", self.del_cmd(identifier))
            .await
            .map(|_| ());
        settle(self.durability, "redis", "remove", outcome)
    }

    fn expirable(&self) -> Option<&dyn Expirable> {
        Some(self)
    }

    fn for_request(self: Arc<Self>, _request: &dyn RequestSurface) -> Arc<dyn SessionStorage> {
        self
    }
}

/// Redis enforces expiry itself; collection has nothing to do.
#[async_trait]
impl Expirable for RedisStorage {
    async fn gc(&self) -> Result<usize> {
        Ok(0)
    }
}
