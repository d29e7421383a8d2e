use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    pub ftp: Option<FtpConfig>,
    pub teams: Option<TeamsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default = "default_stream_width")]
    pub stream_width: u32,
    #[serde(default = "default_stream_height")]
    pub stream_height: u32,
    #[serde(default)]
    pub vflip: bool,
    #[serde(default)]
    pub hflip: bool,
    #[serde(default)]
    pub preview: bool,
    /// Still-capture CLI, e.g. `rpicam-still` or the older `libcamera-still`.
    #[serde(default = "default_camera_command")]
    pub command: String,
    /// Exposure / white-balance settle time before a full-resolution shot.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    /// Minimum per-pixel green difference that counts as a changed pixel.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// Number of changed pixels that must be exceeded to report motion.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_image_path")]
    pub path: PathBuf,
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Numeric file names when true, timestamp file names otherwise.
    #[serde(default)]
    pub numbering: bool,
    #[serde(default = "default_num_start")]
    pub num_start: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FtpConfig {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsConfig {
    pub webhook_url: String,
    /// Public URL prefix under which uploaded images can be fetched.
    #[serde(default)]
    pub image_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When false only warnings and errors are logged.
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            image_width: default_image_width(),
            image_height: default_image_height(),
            stream_width: default_stream_width(),
            stream_height: default_stream_height(),
            vflip: false,
            hflip: false,
            preview: false,
            command: default_camera_command(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            sensitivity: default_sensitivity(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            path: default_image_path(),
            name_prefix: default_name_prefix(),
            numbering: false,
            num_start: default_num_start(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            verbose: default_verbose(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn effective_level(&self) -> &str {
        if self.verbose {
            &self.level
        } else {
            "warn"
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        if cam.image_width == 0 || cam.image_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image resolution must be non-zero, got {}x{}",
                cam.image_width, cam.image_height
            )));
        }
        if cam.stream_width == 0 || cam.stream_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "stream resolution must be non-zero, got {}x{}",
                cam.stream_width, cam.stream_height
            )));
        }
        if self.images.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("images.path must not be empty".into()));
        }
        if cam.command.trim().is_empty() {
            return Err(ConfigError::Invalid("camera.command must not be empty".into()));
        }
        if let Some(teams) = &self.teams {
            if teams.webhook_url.is_empty() {
                return Err(ConfigError::Invalid("teams.webhook_url must not be empty".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_image_width() -> u32 {
    1280
}
fn default_image_height() -> u32 {
    720
}
fn default_stream_width() -> u32 {
    128
}
fn default_stream_height() -> u32 {
    80
}
fn default_camera_command() -> String {
    "rpicam-still".into()
}
fn default_settle_ms() -> u64 {
    1000
}
fn default_threshold() -> u32 {
    10
}
fn default_sensitivity() -> u32 {
    100
}
fn default_image_path() -> PathBuf {
    PathBuf::from("images")
}
fn default_name_prefix() -> String {
    "mo-".into()
}
fn default_num_start() -> u64 {
    1000
}
fn default_ftp_port() -> u16 {
    21
}
fn default_remote_dir() -> String {
    "/".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_verbose() -> bool {
    true
}
