//! JSON-file HistoryStore implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use murmur_core::error::Result;
use murmur_core::history::{HistoryEntry, HistoryStore};
use tokio::sync::Mutex;

use crate::paths::MurmurPaths;
use crate::storage::{read_optional, write_atomic};

/// Conversation log kept as a JSON array in a single file.
///
/// Every write rewrites the file atomically. When the total text length of the
/// log exceeds `max_chars`, only the newer half of the entries is kept.
pub struct JsonHistoryStore {
    path: PathBuf,
    max_chars: usize,
    /// Serialises read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    /// Creates a store at `~/.local/share/murmur/history.json`.
    pub fn new(max_chars: usize) -> Result<Self> {
        Ok(Self::with_path(MurmurPaths::default().history_file()?, max_chars))
    }

    pub fn with_path(path: PathBuf, max_chars: usize) -> Self {
        Self {
            path,
            max_chars,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read(&self) -> Result<Vec<HistoryEntry>> {
        match read_optional(&self.path).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&self.path, json.as_bytes()).await
    }

    fn trim(&self, entries: &mut Vec<HistoryEntry>) {
        let total: usize = entries.iter().map(|e| e.text.chars().count()).sum();
        if total <= self.max_chars {
            return;
        }
        let drop = entries.len() / 2;
        entries.drain(..drop);
        tracing::info!(
            "[History] {} chars exceeds {}, dropped {} oldest entries",
            total,
            self.max_chars,
            drop
        );
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read().await?;
        entries.push(entry.clone());
        self.trim(&mut entries);
        self.write(&entries).await
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.write_lock.lock().await;
        self.read().await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&[]).await?;
        tracing::info!("[History] Cleared {}", self.path.display());
        Ok(())
    }
}
