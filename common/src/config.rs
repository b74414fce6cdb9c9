use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Exact origins, or `scheme://*.domain` patterns matching any subdomain.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Relative paths are resolved against the directory holding the config file.
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    /// ffmpeg input format for local devices (`-f <device_format>`).
    #[serde(default = "default_device_format")]
    pub device_format: String,
    /// `{index}` is replaced by the requested camera index.
    #[serde(default = "default_device_path_template")]
    pub device_path_template: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_local_probe_addr")]
    pub local_probe_addr: String,
    #[serde(default = "default_public_ip_url")]
    pub public_ip_url: String,
    #[serde(default = "default_public_ip_timeout_ms")]
    pub public_ip_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: default_ffmpeg_bin(),
            device_format: default_device_format(),
            device_path_template: default_device_path_template(),
            width: default_width(),
            height: default_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_probe_addr: default_local_probe_addr(),
            public_ip_url: default_public_ip_url(),
            public_ip_timeout_ms: default_public_ip_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Absolute images directory. `base_dir` is where the config file lives.
    pub fn images_dir(&self, base_dir: &Path) -> Result<PathBuf, ConfigError> {
        let dir = Path::new(&self.storage.images_dir);
        let joined = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base_dir.join(dir)
        };
        std::path::absolute(&joined)
            .map_err(|e| ConfigError::ResolvePath(joined.display().to_string(), e))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to resolve path {0}: {1}")]
    ResolvePath(String, std::io::Error),
}

// Default value functions
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:3001".into(),
        "https://*.vercel.app".into(),
        "https://streamlive.vercel.app".into(),
    ]
}
fn default_images_dir() -> String {
    "images".into()
}
fn default_ffmpeg_bin() -> String {
    "ffmpeg".into()
}
fn default_device_format() -> String {
    "v4l2".into()
}
fn default_device_path_template() -> String {
    "/dev/video{index}".into()
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_jpeg_quality() -> u8 {
    95
}
fn default_local_probe_addr() -> String {
    "8.8.8.8:80".into()
}
fn default_public_ip_url() -> String {
    "https://api.ipify.org".into()
}
fn default_public_ip_timeout_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".into()
}
