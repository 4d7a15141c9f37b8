//! Configuration for inklet.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (OPENAI_API_KEY, MODEL_NAME, SUPABASE_URL,
//!    SUPABASE_ANON_KEY, ELEVENLABS_API_KEY, ELEVENLABS_VOICE_ID)
//! 2. Config file (.inklet/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .inklet/config.yaml
//! - API keys come from the environment only; the file never holds secrets
//!
//! A missing key only fails the command that needs the corresponding
//! client, so `inklet list` works without an OpenAI key.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub vision: VisionSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub speech: SpeechSection,
    #[serde(default)]
    pub processing: ProcessingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisionSection {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    pub url: Option<String>,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechSection {
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingSection {
    pub jpeg_quality: Option<u8>,
    pub preview_edge: Option<u32>,
    pub error_pause_ms: Option<u64>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub vision: VisionSettings,
    pub store: StoreSettings,
    pub speech: SpeechSettings,
    pub processing: ProcessingSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Vision transcription endpoint settings
#[derive(Debug, Clone)]
pub struct VisionSettings {
    /// OPENAI_API_KEY; absent until the environment provides it
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Record/blob store settings
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// SUPABASE_URL; env overrides the config file
    pub url: Option<String>,
    /// SUPABASE_ANON_KEY
    pub api_key: Option<String>,
    /// Storage bucket that receives uploaded source images
    pub bucket: String,
}

/// Speech synthesis settings
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// ELEVENLABS_API_KEY
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub base_url: String,
}

/// Batch processing knobs
#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    /// JPEG quality factor for HEIC conversion output
    pub jpeg_quality: u8,
    /// Longest edge of generated preview thumbnails, in pixels
    pub preview_edge: u32,
    /// Pause after a per-file failure so the error stays visible
    pub error_pause_ms: u64,
}

impl ProcessingSettings {
    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_ms)
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            preview_edge: 192,
            error_pause_ms: 1200,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".inklet").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match &config_file {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let vision = VisionSettings {
        api_key: env_var("OPENAI_API_KEY"),
        model: env_var("MODEL_NAME")
            .or(file.vision.model)
            .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        base_url: file
            .vision
            .base_url
            .unwrap_or_else(|| "https://api.openai.com".to_string()),
    };

    let store = StoreSettings {
        url: env_var("SUPABASE_URL").or(file.store.url),
        api_key: env_var("SUPABASE_ANON_KEY"),
        bucket: file.store.bucket.unwrap_or_else(|| "notes".to_string()),
    };

    let speech = SpeechSettings {
        api_key: env_var("ELEVENLABS_API_KEY"),
        voice_id: env_var("ELEVENLABS_VOICE_ID")
            .or(file.speech.voice_id)
            .unwrap_or_else(|| "mM1PRloZ2t81CV01YcC2".to_string()),
        model_id: file
            .speech
            .model_id
            .unwrap_or_else(|| "eleven_multilingual_v2".to_string()),
        base_url: file
            .speech
            .base_url
            .unwrap_or_else(|| "https://api.elevenlabs.io".to_string()),
    };

    let defaults = ProcessingSettings::default();
    let processing = ProcessingSettings {
        jpeg_quality: file
            .processing
            .jpeg_quality
            .unwrap_or(defaults.jpeg_quality)
            .min(100),
        preview_edge: file
            .processing
            .preview_edge
            .unwrap_or(defaults.preview_edge)
            .max(16),
        error_pause_ms: file
            .processing
            .error_pause_ms
            .unwrap_or(defaults.error_pause_ms),
    };

    Ok(ResolvedConfig {
        vision,
        store,
        speech,
        processing,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let inklet_dir = temp.path().join(".inklet");
        std::fs::create_dir_all(&inklet_dir).unwrap();

        let config_path = inklet_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
vision:
  model: gpt-4o
store:
  url: https://example.supabase.co
  bucket: scans
speech:
  voice_id: abc123
processing:
  jpeg_quality: 70
  error_pause_ms: 250
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.vision.model, Some("gpt-4o".to_string()));
        assert_eq!(
            config.store.url,
            Some("https://example.supabase.co".to_string())
        );
        assert_eq!(config.store.bucket, Some("scans".to_string()));
        assert_eq!(config.speech.voice_id, Some("abc123".to_string()));
        assert_eq!(config.processing.jpeg_quality, Some(70));
        assert_eq!(config.processing.error_pause_ms, Some(250));
    }

    #[test]
    fn test_empty_config_file_uses_defaults() {
        let file = ConfigFile::default();
        assert!(file.vision.model.is_none());
        assert!(file.store.bucket.is_none());

        let processing = ProcessingSettings::default();
        assert_eq!(processing.jpeg_quality, 85);
        assert_eq!(processing.preview_edge, 192);
        assert_eq!(processing.error_pause(), Duration::from_millis(1200));
    }
}
