//! Configuration module for the pronunciation-practice engine.
//!
//! Provides `EngineConfig` (top-level settings), sub-configs for each
//! subsystem, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `EngineConfig::load` / `EngineConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AssessmentConfig, CacheConfig, EngineConfig, StreamConfig, SynthesisConfig,
};
