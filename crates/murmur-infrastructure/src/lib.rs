//! File-backed adapters for murmur: paths, persona roster, settings and
//! conversation history.

pub mod json_history_store;
pub mod paths;
pub mod storage;
pub mod toml_persona_repository;
pub mod toml_settings_repository;

pub use json_history_store::JsonHistoryStore;
pub use paths::MurmurPaths;
pub use toml_persona_repository::TomlPersonaRepository;
pub use toml_settings_repository::TomlSettingsRepository;
