use super::entry::HistoryEntry;

/// Number of recent entries a prompt sees by default.
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Read-only snapshot of the most recent conversation, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    entries: Vec<HistoryEntry>,
}

impl ConversationContext {
    /// Keeps the last `window` entries of `entries`.
    pub fn from_entries(mut entries: Vec<HistoryEntry>, window: usize) -> Self {
        if entries.len() > window {
            entries.drain(..entries.len() - window);
        }
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy with `entry` appended, dropping the oldest entry when
    /// the window is full.
    pub fn with_entry(&self, entry: HistoryEntry, window: usize) -> Self {
        let mut entries = self.entries.clone();
        entries.push(entry);
        Self::from_entries(entries, window)
    }
}
