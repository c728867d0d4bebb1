use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{CounterResult, CounterStore};

#[derive(Debug, Clone)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct Token {
    owner: String,
    expires_at: Instant,
}

/// In-process counters
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
    tokens: DashMap<String, Token>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_now(&self, key: &str, window: Duration) -> u64 {
        let now = Instant::now();
        let mut entry = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + window,
        });
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }
        entry.count += 1;
        entry.count
    }

    pub fn get_now(&self, key: &str) -> u64 {
        self.counters
            .get(key)
            .filter(|c| c.expires_at > Instant::now())
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn put_token_now(&self, token: &str, owner: &str, ttl: Duration) {
        self.tokens.insert(
            token.to_string(),
            Token {
                owner: owner.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn token_owner_now(&self, token: &str) -> Option<String> {
        let now = Instant::now();
        let owner = self
            .tokens
            .get(token)
            .filter(|t| t.expires_at > now)
            .map(|t| t.owner.clone());
        if owner.is_none() {
            self.tokens.remove(token);
        }
        owner
    }

    /// Counters plus tokens currently held, expired or not
    pub fn len(&self) -> usize {
        self.counters.len() + self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired counters and tokens
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.len();
        self.counters.retain(|_, c| c.expires_at > now);
        self.tokens.retain(|_, t| t.expires_at > now);
        before.saturating_sub(self.len())
    }

    /// Purge periodically until the store is dropped
    pub fn spawn_purge(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "expired demo counters purged");
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> CounterResult<u64> {
        Ok(self.incr_now(key, window))
    }

    async fn get(&self, key: &str) -> CounterResult<u64> {
        Ok(self.get_now(key))
    }

    async fn put_token(&self, token: &str, owner: &str, ttl: Duration) -> CounterResult<()> {
        self.put_token_now(token, owner, ttl);
        Ok(())
    }

    async fn token_owner(&self, token: &str) -> CounterResult<Option<String>> {
        Ok(self.token_owner_now(token))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_counts_within_window() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_secs(60);
        assert_eq!(store.get_now("demo:1.2.3.4"), 0);
        assert_eq!(store.incr_now("demo:1.2.3.4", window), 1);
        assert_eq!(store.incr_now("demo:1.2.3.4", window), 2);
        assert_eq!(store.get_now("demo:1.2.3.4"), 2);
        assert_eq!(store.get_now("demo:5.6.7.8"), 0);
    }

    #[test]
    fn test_counter_resets_after_window() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_millis(20);
        store.incr_now("k", window);
        store.incr_now("k", window);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(store.get_now("k"), 0);
        assert_eq!(store.incr_now("k", window), 1);
    }

    #[test]
    fn test_tokens_expire() {
        let store = MemoryCounterStore::new();
        store.put_token_now("live", "1.2.3.4", Duration::from_secs(60));
        store.put_token_now("stale", "1.2.3.4", Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.token_owner_now("live").as_deref(), Some("1.2.3.4"));
        assert_eq!(store.token_owner_now("stale"), None);
        assert_eq!(store.token_owner_now("unknown"), None);
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryCounterStore::new();
        store.incr_now("old", Duration::from_millis(5));
        store.incr_now("new", Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.get_now("new"), 1);
    }
}
