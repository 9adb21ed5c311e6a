//! Conversation history: entries, the recent-window snapshot handed to
//! prompts, and the store abstraction.

mod context;
mod entry;
mod store;

pub use context::{ConversationContext, DEFAULT_CONTEXT_WINDOW};
pub use entry::{HistoryEntry, Speaker};
pub use store::{HistoryStore, InMemoryHistoryStore};
