use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use crate::shaders;

/// Where shader stage text comes from. Read once per stage at construction.
pub trait ShaderSource {
    fn read(&self, path: &str) -> io::Result<String>;
}

/// Reads stage files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShaderSource for FileSource {
    fn read(&self, path: &str) -> io::Result<String> {
        let full = self.root.join(path);
        tracing::debug!(path = %full.display(), "reading shader source");
        std::fs::read_to_string(full)
    }
}

/// In-memory sources keyed by path.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    files: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stage sources shipped with the engine.
    pub fn builtin() -> Self {
        Self::new()
            .with("block.vert", shaders::BLOCK_VERT)
            .with("block.frag", shaders::BLOCK_FRAG)
            .with("gui.vert", shaders::GUI_VERT)
            .with("gui.frag", shaders::GUI_FRAG)
    }

    pub fn with(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.files.insert(path.into(), source.into());
        self
    }
}

impl ShaderSource for StaticSource {
    fn read(&self, path: &str) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no built-in source '{path}'"))
        })
    }
}
