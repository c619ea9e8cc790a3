//! Render configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strahl_math::{normalize, Color, Vec3};

use crate::bucket::DEFAULT_BUCKET_SIZE;

/// What a ray that leaves the scene sees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Solid color
    Flat(Color),
    /// Blend from `bottom` to `top` along the camera's up axis
    Gradient { bottom: Color, top: Color },
}

impl Background {
    /// Sky gradient: white at the horizon, light blue overhead.
    pub fn sky() -> Self {
        Background::Gradient {
            bottom: Color::ONE,
            top: Color::new(0.5, 0.7, 1.0),
        }
    }

    /// Color seen along `direction` for a camera whose up axis is `up`.
    pub fn color(&self, direction: Vec3, up: Vec3) -> Color {
        match *self {
            Background::Flat(color) => color,
            Background::Gradient { bottom, top } => {
                let a = 0.5 * (normalize(direction).dot(up) + 1.0);
                bottom * (1.0 - a) + top * a
            }
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::sky()
    }
}

/// Which evaluator runs the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Single thread, row-major
    Sequential,
    /// Buckets across the rayon thread pool
    #[default]
    Parallel,
    /// Compute kernel over the packed buffers, falling back to the host
    Device,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Device => "device",
        };
        f.write_str(name)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            "device" | "gpu" => Ok(ExecutionMode::Device),
            other => Err(format!(
                "unknown mode '{}' (expected sequential, parallel or device)",
                other
            )),
        }
    }
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Maximum recursion depth; rays at this depth resolve to black
    pub max_depth: u32,
    /// Color for rays that escape the scene
    pub background: Background,
    pub mode: ExecutionMode,
    /// Base seed for per-pixel random streams
    pub seed: u64,
    /// Bucket edge length for parallel mode
    pub bucket_size: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_depth: 8,
            background: Background::default(),
            mode: ExecutionMode::default(),
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RenderSettings {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
