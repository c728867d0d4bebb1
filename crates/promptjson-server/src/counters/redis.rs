use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use super::{CounterError, CounterResult, CounterStore};

const TOKEN_PREFIX: &str = "demo_token:";

impl From<redis::RedisError> for CounterError {
    fn from(err: redis::RedisError) -> Self {
        CounterError::Backend(err.to_string())
    }
}

/// Counters shared by every server instance through Redis
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> CounterResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis for demo counters");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> CounterResult<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(key, 1u64).await?;
        if count == 1 {
            let seconds = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
            let _: () = conn.expire(key, seconds).await?;
        }
        Ok(count)
    }

    async fn get(&self, key: &str) -> CounterResult<u64> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn.get(key).await?;
        Ok(count.unwrap_or(0))
    }

    async fn put_token(&self, token: &str, owner: &str, ttl: Duration) -> CounterResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(format!("{}{}", TOKEN_PREFIX, token), owner, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn token_owner(&self, token: &str) -> CounterResult<Option<String>> {
        let mut conn = self.conn.clone();
        let owner: Option<String> = conn.get(format!("{}{}", TOKEN_PREFIX, token)).await?;
        Ok(owner)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
