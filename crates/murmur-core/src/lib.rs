//! Core domain of murmur, a group-chat simulator in which a roster of personas
//! decide whether and how to respond to each message.
//!
//! Everything here is backend-agnostic: generation goes through the
//! [`generation::GenerationService`] trait and history through
//! [`history::HistoryStore`].

pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod interest;
pub mod keywords;
pub mod model;
pub mod persona;
pub mod prompt;
pub mod schedule;
pub mod selection;
pub mod turn;

// Re-export common error type
pub use error::{MurmurError, Result};
