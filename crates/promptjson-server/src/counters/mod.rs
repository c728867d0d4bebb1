//! Quota counters and demo tokens for unauthenticated access.

mod gate;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use gate::{DemoGate, DemoUsage};
pub use memory::MemoryCounterStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisCounterStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("counter backend error: {0}")]
    Backend(String),
}

pub type CounterResult<T> = std::result::Result<T, CounterError>;

/// Windowed counters and expiring tokens
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`. The window starts with the first increment.
    async fn incr(&self, key: &str, window: Duration) -> CounterResult<u64>;

    /// Current count, zero when absent or expired
    async fn get(&self, key: &str) -> CounterResult<u64>;

    async fn put_token(&self, token: &str, owner: &str, ttl: Duration) -> CounterResult<()>;

    /// Owner recorded for a live token
    async fn token_owner(&self, token: &str) -> CounterResult<Option<String>>;

    fn backend(&self) -> &'static str;
}
