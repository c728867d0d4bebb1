//! Append-only JSON lines file, one record per line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use promptjson_core::{ConversionRecord, NewConversion};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{newest_first, ConversionStore, StoreResult};

pub struct JsonlConversionStore {
    path: PathBuf,
    /// Serializes appends and rewrites
    write_lock: Mutex<()>,
}

impl JsonlConversionStore {
    /// Open the store, creating the parent directory if needed
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        info!("Conversion store at {:?}", path);
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_all(&self) -> StoreResult<Vec<ConversionRecord>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut records = Vec::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConversionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = index + 1, error = %e, "skipping unreadable record"),
            }
        }

        Ok(records)
    }

    async fn rewrite(&self, records: &[ConversionRecord]) -> StoreResult<()> {
        let mut content = String::new();
        for record in records {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversionStore for JsonlConversionStore {
    async fn create(&self, conversion: NewConversion) -> StoreResult<ConversionRecord> {
        let record = ConversionRecord::from_new(conversion);
        let line = serde_json::to_string(&record)?;

        let _guard = self.write_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        debug!(record_id = %record.id, "conversion saved");
        Ok(record)
    }

    async fn find_by_owner(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ConversionRecord>> {
        let records = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        Ok(newest_first(records, limit))
    }

    async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let records = self.load_all().await?;
        let before = records.len();
        let kept: Vec<ConversionRecord> = records
            .into_iter()
            .filter(|r| !(r.id == id && r.user_id == user_id))
            .collect();

        if kept.len() == before {
            return Ok(false);
        }
        self.rewrite(&kept).await?;
        Ok(true)
    }

    fn backend(&self) -> &'static str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptjson_core::StructuredResult;
    use tempfile::TempDir;

    fn conversion(user: &str, prompt: &str) -> NewConversion {
        NewConversion {
            original_prompt: prompt.to_string(),
            generated_json: StructuredResult::new("analyze", prompt)
                .with_constraints(vec!["tone: formal".to_string()]),
            llm_provider: "mistral".to_string(),
            user_id: user.to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("conversions.jsonl");

        let store = JsonlConversionStore::open(&path).await.unwrap();
        let created = store.create(conversion("alice", "p1")).await.unwrap();
        store.create(conversion("bob", "p2")).await.unwrap();

        let reopened = JsonlConversionStore::open(&path).await.unwrap();
        let found = reopened.find_by_owner("alice", 10).await.unwrap();
        assert_eq!(found, vec![created]);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"originalPrompt\":\"p1\""));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonlConversionStore::open(dir.path().join("none.jsonl")).await.unwrap();
        assert!(store.find_by_owner("alice", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonlConversionStore::open(dir.path().join("c.jsonl")).await.unwrap();
        let first = store.create(conversion("alice", "p1")).await.unwrap();
        store.create(conversion("alice", "p2")).await.unwrap();

        assert!(store.delete("alice", &first.id).await.unwrap());
        assert!(!store.delete("alice", &first.id).await.unwrap());

        let remaining = store.find_by_owner("alice", 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].original_prompt, "p2");
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.jsonl");
        let store = JsonlConversionStore::open(&path).await.unwrap();
        store.create(conversion("alice", "p1")).await.unwrap();

        let mut content = tokio::fs::read_to_string(&path).await.unwrap();
        content.push_str("{not json\n");
        tokio::fs::write(&path, content).await.unwrap();

        assert_eq!(store.find_by_owner("alice", 10).await.unwrap().len(), 1);
    }
}
