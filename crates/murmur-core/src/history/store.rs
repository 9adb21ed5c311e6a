//! History store trait.
//!
//! Defines the interface for conversation history persistence.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::entry::HistoryEntry;
use crate::error::Result;

/// An abstract store for the conversation log.
///
/// The orchestrator only appends finished entries and reads a recent window;
/// trimming and file format are up to the implementation.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one entry to the end of the log.
    ///
    /// # Arguments
    ///
    /// * `entry` - The entry to append
    async fn append(&self, entry: &HistoryEntry) -> Result<()>;

    /// Loads the whole log, oldest first.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<HistoryEntry>)`: The stored entries (empty if none)
    /// - `Err(MurmurError)`: Error if the log cannot be read
    async fn load(&self) -> Result<Vec<HistoryEntry>>;

    /// Removes every entry.
    async fn clear(&self) -> Result<()>;
}

/// Process-local history, lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}
