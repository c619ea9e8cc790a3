//! Scene file layout: a scene description plus optional image and render blocks.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use strahl_core::{Scene, SceneDescription};
use strahl_renderer::RenderSettings;

use crate::cli::Args;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub scene: SceneDescription,
    #[serde(default)]
    pub image: ImageSize,
    #[serde(default)]
    pub render: RenderSettings,
}

impl Document {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply command-line overrides.
    pub fn apply(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.image.width = width;
        }
        if let Some(height) = args.height {
            self.image.height = height;
        }
        if let Some(depth) = args.depth {
            self.render.max_depth = depth;
        }
        if let Some(mode) = args.mode {
            self.render.mode = mode;
        }
        if let Some(seed) = args.seed {
            self.render.seed = seed;
        }
    }

    /// Build the scene, with the active camera's samples overridden when asked.
    pub fn build(&self, samples: Option<u32>) -> anyhow::Result<Scene> {
        let mut scene = self.scene.build().context("Invalid scene description")?;
        override_samples(&mut scene, samples)?;
        Ok(scene)
    }
}

pub fn override_samples(scene: &mut Scene, samples: Option<u32>) -> anyhow::Result<()> {
    if let Some(samples) = samples {
        let id = scene.active_camera()?.id();
        scene.camera_mut(id)?.antialiasing(samples);
    }
    Ok(())
}
