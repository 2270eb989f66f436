//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout (config dir — settings + persistent URL cache):
//!   Windows: %APPDATA%\pronounce-engine\
//!   macOS:   ~/Library/Application Support/pronounce-engine/
//!   Linux:   ~/.config/pronounce-engine/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `url-cache.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `url-cache.json` — the persistent synthesis URL cache.
    pub url_cache_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "pronounce-engine";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let url_cache_file = config_dir.join("url-cache.json");

        Self {
            config_dir,
            settings_file,
            url_cache_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .url_cache_file
            .file_name()
            .is_some_and(|n| n == "url-cache.json"));
    }
}
