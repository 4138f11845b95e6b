use serde::{Deserialize, Serialize};
use std::path::Path;
use voxel_common::Color;
use voxel_render::UniformVariable;

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("day cycle has no phases")]
    EmptyCycle,
    #[error("day cycle has zero total duration")]
    ZeroLengthCycle,
    #[error("failed to read day cycle {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse day cycle {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// One named lighting phase of the day/night cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayState {
    pub name: String,
    pub duration_ms: u64,
    pub start_light: Color,
    pub end_light: Color,
}

impl DayState {
    pub fn new(name: impl Into<String>, duration_ms: u64, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            start_light: Color::from_packed(start),
            end_light: Color::from_packed(end),
        }
    }

    /// Colour at `elapsed_ms` into the phase. A zero-length phase shows its
    /// start colour.
    pub fn light_at(&self, elapsed_ms: u64) -> Color {
        if self.duration_ms == 0 {
            return self.start_light;
        }
        let progress = elapsed_ms as f32 / self.duration_ms as f32;
        Color::lerp(self.start_light, self.end_light, progress)
    }
}

/// Ordered, wrapping sequence of [`DayState`]s with a non-zero total length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DayCycle {
    phases: Vec<DayState>,
}

impl DayCycle {
    pub fn new(phases: Vec<DayState>) -> Result<Self, EnvError> {
        if phases.is_empty() {
            return Err(EnvError::EmptyCycle);
        }
        if phases.iter().all(|p| p.duration_ms == 0) {
            return Err(EnvError::ZeroLengthCycle);
        }
        Ok(Self { phases })
    }

    /// Read a cycle from a JSON array of phases.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EnvError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let phases: Vec<DayState> =
            serde_json::from_str(&text).map_err(|source| EnvError::Json {
                path: path.display().to_string(),
                source,
            })?;
        let cycle = Self::new(phases)?;
        tracing::info!(path = %path.display(), phases = cycle.len(), "day cycle loaded");
        Ok(cycle)
    }

    pub fn phases(&self) -> &[DayState] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Phase at `index`, wrapping past the end.
    pub fn phase(&self, index: usize) -> &DayState {
        &self.phases[index % self.phases.len()]
    }

    pub fn total_ms(&self) -> u64 {
        self.phases.iter().map(|p| p.duration_ms).sum()
    }
}

impl Default for DayCycle {
    /// Dawn, day, dusk, night; each phase ends on the next one's start colour.
    fn default() -> Self {
        Self {
            phases: vec![
                DayState::new("dawn", 20_000, 0x202040, 0xFFB080),
                DayState::new("day", 60_000, 0xFFB080, 0xFFFFFF),
                DayState::new("dusk", 20_000, 0xFFFFFF, 0xA05030),
                DayState::new("night", 40_000, 0xA05030, 0x202040),
            ],
        }
    }
}

/// A light contributing to block shading. `Global` is the sun or moon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightSource {
    Global,
    Emissive,
}

impl LightSource {
    pub const COUNT: usize = 2;
    pub const ALL: [LightSource; Self::COUNT] = [LightSource::Global, LightSource::Emissive];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Uniform this source's colour is loaded into.
    pub fn uniform(self) -> UniformVariable {
        match self {
            LightSource::Global => UniformVariable::LightingGlobal,
            LightSource::Emissive => UniformVariable::LightingEmissive,
        }
    }
}
