//! Engine settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SynthesisConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech-synthesis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Base URL of the synthesis API.
    pub base_url: String,
    /// API key — `None` for deployments that require no authentication.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for the non-streaming synthesis endpoint.
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AssessmentConfig
// ---------------------------------------------------------------------------

/// Settings for the remote pronunciation-assessment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Base URL of the assessment API.
    pub base_url: String,
    /// API key — `None` for deployments that require no authentication.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a single assessment request.
    pub timeout_secs: u64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Tunables for incremental audio streaming.
///
/// The idle timeouts implement the end-of-stream heuristic: the transport
/// does not reliably signal logical end-of-stream in all deployments, so a
/// read that stays silent for the idle window is treated as complete.
/// `max_stream_secs` is the hard upper bound that keeps a stalled but
/// never-closed connection from hanging a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Idle window (ms) on the incremental-playback path.
    pub stream_idle_timeout_ms: u64,
    /// Idle window (ms) on the buffered (collect-then-play) path.
    pub buffered_idle_timeout_ms: u64,
    /// Bytes that must accumulate before opportunistic playback starts.
    pub min_start_bytes: usize,
    /// Hard cap on the total time spent reading one stream.
    pub max_stream_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream_idle_timeout_ms: 800,
            buffered_idle_timeout_ms: 500,
            min_start_bytes: 32 * 1024,
            max_stream_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Settings for the synthesis result caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held in the in-process memory cache.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { memory_capacity: 10 }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level engine configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use pronounce_engine::config::EngineConfig;
///
/// // Load (returns Default when file is missing)
/// let config = EngineConfig::load().unwrap();
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Speech-synthesis service settings.
    pub synthesis: SynthesisConfig,
    /// Pronunciation-assessment service settings.
    pub assessment: AssessmentConfig,
    /// Streaming tunables (idle timeouts, start-burst size, hard cap).
    pub stream: StreamConfig,
    /// Cache tier settings.
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(EngineConfig::default())` when the file does not exist
    /// yet (first-run scenario) so callers never need to special-case a
    /// missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `EngineConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = EngineConfig::default();
        original.save_to(&path).expect("save");

        let loaded = EngineConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = EngineConfig::load_from(&path).expect("should not error");
        assert_eq!(config, EngineConfig::default());
    }

    /// Verify the documented default tunables.
    #[test]
    fn default_stream_tunables() {
        let cfg = EngineConfig::default();

        assert_eq!(cfg.stream.stream_idle_timeout_ms, 800);
        assert_eq!(cfg.stream.buffered_idle_timeout_ms, 500);
        assert_eq!(cfg.stream.min_start_bytes, 32 * 1024);
        assert_eq!(cfg.stream.max_stream_secs, 60);
        assert_eq!(cfg.cache.memory_capacity, 10);
        assert_eq!(cfg.synthesis.timeout_secs, 30);
        assert!(cfg.synthesis.api_key.is_none());
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = EngineConfig::default();
        cfg.synthesis.base_url = "https://speech.example.com".into();
        cfg.synthesis.api_key = Some("sk-test".into());
        cfg.assessment.base_url = "https://score.example.com".into();
        cfg.stream.stream_idle_timeout_ms = 1_200;
        cfg.stream.min_start_bytes = 64 * 1024;
        cfg.cache.memory_capacity = 4;

        cfg.save_to(&path).expect("save");
        let loaded = EngineConfig::load_from(&path).expect("load");

        assert_eq!(loaded, cfg);
    }
}
