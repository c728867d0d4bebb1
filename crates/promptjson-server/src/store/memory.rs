use async_trait::async_trait;
use promptjson_core::{ConversionRecord, NewConversion};
use tokio::sync::RwLock;

use super::{newest_first, ConversionStore, StoreResult};

/// Process-local store; records are lost on restart
#[derive(Debug, Default)]
pub struct MemoryConversionStore {
    records: RwLock<Vec<ConversionRecord>>,
}

impl MemoryConversionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ConversionStore for MemoryConversionStore {
    async fn create(&self, conversion: NewConversion) -> StoreResult<ConversionRecord> {
        let record = ConversionRecord::from_new(conversion);
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_by_owner(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ConversionRecord>> {
        let records = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(records, limit))
    }

    async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(records.len() != before)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
