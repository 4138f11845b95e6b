use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from loading a startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Graphics API version requested when the rendering context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlVersion {
    pub major: u8,
    pub minor: u8,
}

impl Default for GlVersion {
    fn default() -> Self {
        Self { major: 3, minor: 2 }
    }
}

impl std::fmt::Display for GlVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} core", self.major, self.minor)
    }
}

/// Startup constants. Read once before the loop starts and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame-rate cap applied at the end of every loop iteration.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    pub gl_version: GlVersion,
    pub title: String,
    /// Directory shader stage paths are resolved against. Unset means the
    /// built-in sources.
    pub shader_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            width: 1280,
            height: 720,
            gl_version: GlVersion::default(),
            title: "voxel".into(),
            shader_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load a JSON config. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_reader(file).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_fps == 0 {
            return Err(ConfigError::Invalid("target_fps must be positive".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} is empty",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
