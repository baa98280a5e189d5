//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::pipeline::chunker::{DEFAULT_CHUNK_LIMIT, MAX_INPUT_CHARS};
use crate::tts::Voice;

/// Environment variable that overrides [`TtsConfig::api_key`].
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable that overrides [`ExtractorConfig::api_key`].
pub const EXTRACTOR_API_KEY_ENV: &str = "EXTRACTOR_API_KEY";

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech-synthesis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Base URL of the OpenAI-compatible API (no trailing `/v1`).
    pub base_url: String,
    /// Bearer token. `None` for local providers that need no authentication.
    pub api_key: Option<String>,
    /// Model identifier sent with every request (e.g. `"tts-1"`).
    pub model: String,
    /// Voice used when the caller does not pick one.
    pub default_voice: Voice,
    /// Optional `response_format` field (e.g. `"mp3"`). Omitted when `None`,
    /// leaving the service default in place.
    pub response_format: Option<String>,
    /// Upper bound on simultaneous in-flight synthesis requests.
    pub max_concurrent_requests: usize,
    /// Per-request timeout. `None` means wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "tts-1".into(),
            default_voice: Voice::default(),
            response_format: None,
            max_concurrent_requests: 4,
            request_timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkingConfig
// ---------------------------------------------------------------------------

/// Settings for splitting input text into synthesis-sized segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per segment. Must be in `1..=4096`.
    pub limit: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CHUNK_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractorConfig
// ---------------------------------------------------------------------------

/// Settings for the webpage text-extraction API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Base URL of the extractor API.
    pub base_url: String,
    /// API key passed as the `apikey` query parameter.
    pub api_key: Option<String>,
    /// Seconds to wait for the extractor before giving up.
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://extractorapi.com".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Where finished recordings are stored and how their location is reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Target directory. `None` uses [`AppPaths::audio_dir`].
    pub dir: Option<PathBuf>,
    /// When set, the reported location is `{public_base_url}/{file_name}`
    /// instead of the local file path (e.g. a bucket synced from `dir`).
    pub public_base_url: Option<String>,
}

impl OutputConfig {
    /// The directory the sink should write into.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| AppPaths::new().audio_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Every section is optional in the file; missing sections and keys take
/// their default values.
///
/// ```rust,no_run
/// use speecher::config::AppConfig;
///
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Speech-synthesis service settings.
    pub tts: TtsConfig,
    /// Segment splitting settings.
    pub chunking: ChunkingConfig,
    /// Article extraction settings.
    pub extractor: ExtractorConfig,
    /// Output sink settings.
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
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

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override API keys from the process environment when set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(OPENAI_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.tts.api_key = Some(key);
        }
        if let Some(key) = lookup(EXTRACTOR_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.extractor.api_key = Some(key);
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.limit == 0 || self.chunking.limit > MAX_INPUT_CHARS {
            bail!(
                "chunking.limit must be between 1 and {MAX_INPUT_CHARS}, got {}",
                self.chunking.limit
            );
        }
        if self.tts.max_concurrent_requests == 0 {
            bail!("tts.max_concurrent_requests must be at least 1");
        }
        if self.tts.base_url.trim().is_empty() {
            bail!("tts.base_url must not be empty");
        }
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

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.tts.base_url = "http://localhost:8880".into();
        cfg.tts.api_key = Some("sk-test".into());
        cfg.tts.model = "tts-1-hd".into();
        cfg.tts.default_voice = Voice::Nova;
        cfg.tts.response_format = Some("mp3".into());
        cfg.tts.max_concurrent_requests = 8;
        cfg.tts.request_timeout_secs = Some(90);
        cfg.chunking.limit = 2000;
        cfg.output.dir = Some(dir.path().join("audio"));
        cfg.output.public_base_url = Some("https://cdn.example.com/speecher".into());

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.tts.base_url, "http://localhost:8880");
        assert_eq!(loaded.tts.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.tts.model, "tts-1-hd");
        assert_eq!(loaded.tts.default_voice, Voice::Nova);
        assert_eq!(loaded.tts.response_format.as_deref(), Some("mp3"));
        assert_eq!(loaded.tts.max_concurrent_requests, 8);
        assert_eq!(loaded.tts.request_timeout_secs, Some(90));
        assert_eq!(loaded.chunking.limit, 2000);
        assert_eq!(loaded.output.dir, Some(dir.path().join("audio")));
        assert_eq!(
            loaded.output.public_base_url.as_deref(),
            Some("https://cdn.example.com/speecher")
        );
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.chunking.limit, DEFAULT_CHUNK_LIMIT);
        assert_eq!(config.tts.default_voice, Voice::Alloy);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[tts]\ndefault_voice = \"onyx\"\n").unwrap();

        let config = AppConfig::load_from(&path).expect("load");
        assert_eq!(config.tts.default_voice, Voice::Onyx);
        assert_eq!(config.tts.model, "tts-1");
        assert_eq!(config.chunking.limit, DEFAULT_CHUNK_LIMIT);
    }

    #[test]
    fn unknown_voice_in_file_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[tts]\ndefault_voice = \"brian\"\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.tts.base_url, "https://api.openai.com");
        assert_eq!(cfg.tts.model, "tts-1");
        assert!(cfg.tts.api_key.is_none());
        assert!(cfg.tts.request_timeout_secs.is_none());
        assert_eq!(cfg.tts.max_concurrent_requests, 4);
        assert_eq!(cfg.chunking.limit, 4095);
        assert_eq!(cfg.extractor.base_url, "https://extractorapi.com");
        assert!(cfg.output.dir.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_api_keys() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_with(|name| match name {
            OPENAI_API_KEY_ENV => Some("sk-env".into()),
            EXTRACTOR_API_KEY_ENV => Some("ex-env".into()),
            _ => None,
        });
        assert_eq!(cfg.tts.api_key.as_deref(), Some("sk-env"));
        assert_eq!(cfg.extractor.api_key.as_deref(), Some("ex-env"));
    }

    #[test]
    fn empty_env_value_keeps_file_key() {
        let mut cfg = AppConfig::default();
        cfg.tts.api_key = Some("sk-file".into());
        cfg.apply_env_with(|_| Some(String::new()));
        assert_eq!(cfg.tts.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn validate_rejects_bad_limits() {
        let mut cfg = AppConfig::default();
        cfg.chunking.limit = 0;
        assert!(cfg.validate().is_err());

        cfg.chunking.limit = MAX_INPUT_CHARS + 1;
        assert!(cfg.validate().is_err());

        cfg.chunking.limit = MAX_INPUT_CHARS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut cfg = AppConfig::default();
        cfg.tts.max_concurrent_requests = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resolved_dir_prefers_explicit_dir() {
        let mut out = OutputConfig::default();
        assert!(out.resolved_dir().ends_with("audio"));
        out.dir = Some(PathBuf::from("/tmp/speech"));
        assert_eq!(out.resolved_dir(), PathBuf::from("/tmp/speech"));
    }
}
