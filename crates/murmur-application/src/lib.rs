//! Application layer of murmur: conversation cycles, timed delivery and the
//! background auto-chat loop.

pub mod auto_chat;
pub mod dispatcher;
pub mod orchestrator;

pub use auto_chat::spawn_auto_chat;
pub use dispatcher::DeliveryDispatcher;
pub use orchestrator::{ConversationOrchestrator, CycleKind, CycleReport};
