//! Concrete generation backends for murmur.

pub mod gemini;

pub use gemini::GeminiCliService;
