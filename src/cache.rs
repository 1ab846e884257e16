use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, aio::ConnectionManager};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

const HEALTH_KEY: &str = "health";
const HEALTH_VALUE: &str = "ok";

/// CacheService
///
/// The secondary key/value store. Only liveness data lives here; no business data
/// is cached. Named after the storage seam so tests can swap in `MockCache`.
#[async_trait]
pub trait CacheService: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), String>;

    async fn get(&self, key: &str) -> Result<Option<String>, String>;

    /// probe
    ///
    /// Writes `health = ok` and reads it back. Used by `GET /health`.
    async fn probe(&self) -> Result<String, String> {
        self.set(HEALTH_KEY, HEALTH_VALUE).await?;
        self.get(HEALTH_KEY)
            .await?
            .ok_or_else(|| "health key vanished after write".to_string())
    }
}

/// RedisCache
///
/// Backed by a `ConnectionManager`, which multiplexes one connection and reconnects
/// transparently. Cloning is cheap and shares that connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| e.to_string())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| e.to_string())
    }
}

/// MockCache
///
/// In-memory stand-in used by the test suites.
#[derive(Clone, Default)]
pub struct MockCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
    /// When true, every operation fails as if the server were unreachable.
    pub should_fail: bool,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CacheService for MockCache {
    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Cache Error: connection refused".to_string());
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        if self.should_fail {
            return Err("Mock Cache Error: connection refused".to_string());
        }
        Ok(self.entries.read().await.get(key).cloned())
    }
}

/// CacheState
///
/// The shared handle stored in `AppState`.
pub type CacheState = Arc<dyn CacheService>;
