use std::sync::Arc;
use std::time::Duration;

use promptjson_config::DemoConfig;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{CounterStore, MemoryCounterStore};

/// Usage of a client's demo window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DemoUsage {
    pub remaining: u64,
    pub total: u64,
    pub usage: u64,
}

impl DemoUsage {
    fn new(usage: u64, total: u64) -> Self {
        Self {
            remaining: total.saturating_sub(usage),
            total,
            usage,
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.usage > self.total
    }
}

/// Demo quota and token issuing over a counter store
///
/// Falls back to an in-process store whenever the configured backend fails,
/// so an unavailable Redis degrades to per-instance limits.
#[derive(Clone)]
pub struct DemoGate {
    store: Arc<dyn CounterStore>,
    fallback: Arc<MemoryCounterStore>,
    limit: u64,
    window: Duration,
    token_ttl: Duration,
}

impl DemoGate {
    pub fn new(store: Arc<dyn CounterStore>, config: &DemoConfig) -> Self {
        Self {
            store,
            fallback: Arc::new(MemoryCounterStore::new()),
            limit: config.limit,
            window: Duration::from_secs(config.window_secs),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
        }
    }

    /// Gate over a fresh in-process store, purged hourly
    pub fn in_memory(config: &DemoConfig) -> Self {
        let store = Arc::new(MemoryCounterStore::new());
        store.spawn_purge(Duration::from_secs(60 * 60));
        Self::new(store, config)
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// In-process store, with expired entries dropped first
    fn fallback(&self) -> &MemoryCounterStore {
        self.fallback.purge_expired();
        &self.fallback
    }

    fn key(client: &str) -> String {
        format!("demo:{}", client)
    }

    /// Count one conversion against the client's window
    pub async fn consume(&self, client: &str) -> DemoUsage {
        let key = Self::key(client);
        let count = match self.store.incr(&key, self.window).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "counter store failed, using in-process counters");
                self.fallback().incr_now(&key, self.window)
            }
        };
        debug!(client, count, limit = self.limit, "demo quota consumed");
        DemoUsage::new(count, self.limit)
    }

    pub async fn usage(&self, client: &str) -> DemoUsage {
        let key = Self::key(client);
        let count = match self.store.get(&key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "counter store failed, using in-process counters");
                self.fallback().get_now(&key)
            }
        };
        DemoUsage::new(count.min(self.limit), self.limit)
    }

    /// Issue a 64-hex-character demo token bound to the client
    pub async fn issue_token(&self, client: &str) -> String {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        if let Err(e) = self.store.put_token(&token, client, self.token_ttl).await {
            warn!(error = %e, "counter store failed, keeping token in process");
            self.fallback().put_token_now(&token, client, self.token_ttl);
        }
        info!(client, "demo token issued");
        token
    }

    /// Owner of a live token
    pub async fn token_owner(&self, token: &str) -> Option<String> {
        match self.store.token_owner(token).await {
            Ok(Some(owner)) => Some(owner),
            Ok(None) => self.fallback().token_owner_now(token),
            Err(e) => {
                warn!(error = %e, "counter store failed, checking in-process tokens");
                self.fallback().token_owner_now(token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::{CounterError, CounterResult};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn incr(&self, _key: &str, _window: Duration) -> CounterResult<u64> {
            Err(CounterError::Backend("down".to_string()))
        }
        async fn get(&self, _key: &str) -> CounterResult<u64> {
            Err(CounterError::Backend("down".to_string()))
        }
        async fn put_token(&self, _token: &str, _owner: &str, _ttl: Duration) -> CounterResult<()> {
            Err(CounterError::Backend("down".to_string()))
        }
        async fn token_owner(&self, _token: &str) -> CounterResult<Option<String>> {
            Err(CounterError::Backend("down".to_string()))
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn config(limit: u64) -> DemoConfig {
        DemoConfig {
            limit,
            ..DemoConfig::default()
        }
    }

    #[tokio::test]
    async fn test_limit_is_exceeded_after_limit_calls() {
        let gate = DemoGate::new(Arc::new(MemoryCounterStore::new()), &config(3));

        for expected in 1..=3 {
            let usage = gate.consume("1.2.3.4").await;
            assert_eq!(usage.usage, expected);
            assert!(!usage.is_exceeded());
        }
        assert!(gate.consume("1.2.3.4").await.is_exceeded());
        assert!(!gate.consume("5.6.7.8").await.is_exceeded());

        let usage = gate.usage("1.2.3.4").await;
        assert_eq!(usage, DemoUsage { remaining: 0, total: 3, usage: 3 });
    }

    #[tokio::test]
    async fn test_tokens_are_64_hex_chars() {
        let gate = DemoGate::new(Arc::new(MemoryCounterStore::new()), &config(3));
        let token = gate.issue_token("1.2.3.4").await;

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(gate.token_owner(&token).await.as_deref(), Some("1.2.3.4"));
        assert_eq!(gate.token_owner("nope").await, None);
    }

    #[tokio::test]
    async fn test_broken_backend_falls_back_to_memory() {
        let gate = DemoGate::new(Arc::new(BrokenStore), &config(1));

        assert!(!gate.consume("c").await.is_exceeded());
        assert!(gate.consume("c").await.is_exceeded());
        assert_eq!(gate.usage("c").await.remaining, 0);

        let token = gate.issue_token("c").await;
        assert_eq!(gate.token_owner(&token).await.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_fallback_drops_expired_entries() {
        let config = DemoConfig {
            limit: 5,
            window_secs: 1,
            token_ttl_secs: 1,
            ..DemoConfig::default()
        };
        let gate = DemoGate::new(Arc::new(BrokenStore), &config);

        for client in ["a", "b", "c"] {
            gate.consume(client).await;
        }
        gate.issue_token("a").await;
        assert_eq!(gate.fallback.len(), 4);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(gate.consume("d").await.usage, 1);
        assert_eq!(gate.fallback.len(), 1);
    }
}
