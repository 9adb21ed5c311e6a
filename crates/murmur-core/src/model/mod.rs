//! Backend model selection and fallback.

mod config;
mod controller;

pub use config::{ModelConfig, ModelSpec};
pub use controller::{
    FailureKind, FallbackError, Generation, ModelFallbackController, ModelSnapshot,
};
