//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::recognize::RecognizerBackend;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Camera settings
    pub camera: CameraSettings,
    /// Scanner loop settings
    pub scanner: ScannerSettings,
    /// Remote vision service settings
    pub vision: VisionServiceSettings,
    /// Narration settings
    pub narration: NarrationSettings,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Number of catalog entries to load at startup (151 = Gen 1)
    pub catalog_limit: u32,
    /// Automatically narrate the entry after a successful scan
    pub auto_narrate: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            catalog_limit: 151,
            auto_narrate: true,
        }
    }
}

/// Camera-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Camera device index (see --list-cameras)
    pub device_index: u32,
    /// Requested frame width
    pub width: u32,
    /// Requested frame height
    pub height: u32,
    /// Requested frame rate
    pub fps: u32,
    /// Fraction of the shorter frame dimension used as the scan region
    pub region_fraction: f32,
    /// Side length of the square snapshot handed to recognition
    pub snapshot_size: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 1280,
            height: 720,
            fps: 30,
            region_fraction: 0.8,
            snapshot_size: 400,
        }
    }
}

/// Scan loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Recognition backend to use
    pub backend: RecognizerBackend,
    /// Delay between analysis cycles after a clean "no match" (local backend)
    pub poll_interval_ms: u64,
    /// Delay before retrying after a recognition error
    pub error_backoff_ms: u64,
    /// How long the matched name stays on the HUD before hand-off
    pub match_hold_ms: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::default(),
            poll_interval_ms: 600,
            error_backoff_ms: 1500,
            match_hold_ms: 800,
        }
    }
}

/// Remote vision service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionServiceSettings {
    /// Model identifier for the vision endpoint
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for VisionServiceSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// Narration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    /// Narration enabled
    pub enabled: bool,
    /// Voice name passed to the speech service
    pub voice: String,
    /// Playback volume (0.0 - 1.0)
    pub volume: f32,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: "Kore".to_string(),
            volume: 0.8,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the application config directory
pub fn get_config_dir() -> Result<std::path::PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("dev", "elidex", "EliDex")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Get the application data directory (model cache)
pub fn get_data_dir() -> Result<std::path::PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("dev", "elidex", "EliDex")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.general.catalog_limit, 151);
        assert!(config.general.auto_narrate);

        assert_eq!(config.camera.device_index, 0);
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.camera.height, 720);
        assert!((config.camera.region_fraction - 0.8).abs() < 0.01);
        assert_eq!(config.camera.snapshot_size, 400);

        assert_eq!(config.scanner.backend, RecognizerBackend::LocalOcr);
        assert!(config.scanner.poll_interval_ms < config.scanner.error_backoff_ms);

        assert!(config.narration.enabled);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.general.catalog_limit, config.general.catalog_limit);
        assert_eq!(parsed.camera.width, config.camera.width);
        assert_eq!(parsed.scanner.backend, config.scanner.backend);
        assert_eq!(parsed.vision.model, config.vision.model);
        assert_eq!(parsed.narration.voice, config.narration.voice);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.scanner.backend = RecognizerBackend::RemoteVision;
        config.camera.device_index = 2;
        config.general.catalog_limit = 251;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.scanner.backend, RecognizerBackend::RemoteVision);
        assert_eq!(parsed.camera.device_index, 2);
        assert_eq!(parsed.general.catalog_limit, 251);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[general]\ncatalog_limit = 10\n").unwrap();

        assert_eq!(parsed.general.catalog_limit, 10);
        assert!(parsed.general.auto_narrate);
        assert_eq!(parsed.camera.snapshot_size, 400);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();

        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.general.catalog_limit, config.general.catalog_limit);
        assert_eq!(loaded.scanner.poll_interval_ms, config.scanner.poll_interval_ms);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
