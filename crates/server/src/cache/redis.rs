//! Redis cache backend.
//!
//! Each namespace is one Redis hash. Field-level expiry uses `HEXPIRE`, which
//! requires Redis 7.4 or newer.

use std::time::Duration;

use ::redis::aio::ConnectionManager;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::{CacheBackend, CacheError, Namespace};

/// Redis-backed [`CacheBackend`].
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Redis` if the URL is invalid or the connection fails.
    pub async fn connect(url: &SecretString) -> Result<Self, CacheError> {
        let client = ::redis::Client::open(url.expose_secret())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn hset_with_ttl(
        &self,
        namespace: Namespace,
        entries: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }

        let fields: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        let ttl_secs = ttl.as_secs().max(1);

        // MULTI/EXEC so the write and its expiry land together.
        let mut pipe = ::redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(namespace.as_str())
            .arg(&entries)
            .ignore()
            .cmd("HEXPIRE")
            .arg(namespace.as_str())
            .arg(ttl_secs)
            .arg("FIELDS")
            .arg(fields.len())
            .arg(&fields)
            .ignore();

        let _: () = pipe.query_async(&mut self.conn.clone()).await?;
        Ok(())
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn hmget(
        &self,
        namespace: Namespace,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = ::redis::cmd("HMGET")
            .arg(namespace.as_str())
            .arg(keys)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(values)
    }
}
