//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\speecher\
//!   macOS:   ~/Library/Application Support/speecher/
//!   Linux:   ~/.config/speecher/
//!
//! Data dir (rendered audio):
//!   Windows: %LOCALAPPDATA%\speecher\
//!   macOS:   ~/Library/Application Support/speecher/
//!   Linux:   ~/.local/share/speecher/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default directory the local sink writes finished audio into.
    pub audio_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "speecher";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            audio_dir: data_dir.join("audio"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
