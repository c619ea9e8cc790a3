//! JSON scene descriptions.
//!
//! A description names materials so geometries can refer to them, then
//! replays the normal construction calls on a fresh [`Scene`].
//!
//! ```json
//! {
//!   "materials": [
//!     { "name": "white", "type": "diffuse", "color": [1, 1, 1] }
//!   ],
//!   "geometries": [
//!     { "type": "sphere", "center": [0, 0, -5], "radius": 0.5, "material": "white" }
//!   ],
//!   "lights": [
//!     { "type": "point", "position": [0, 0, 2], "color": [0.6, 0.6, 0.6] }
//!   ],
//!   "cameras": [ { "position": [0, 0, 0], "direction": [0, 0, -1], "up": [0, 1, 0] } ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strahl_math::{Color, Vec3};
use thiserror::Error;

use crate::camera::DEFAULT_FOV;
use crate::geometry::{PlaneConfig, SphereConfig, TriangleConfig};
use crate::light::PointLightConfig;
use crate::material::{DielectricConfig, DiffuseConfig, MetalConfig};
use crate::scene::{Scene, SceneError, DEFAULT_STORE_CAPACITY};

/// Errors that can occur while loading a scene description.
#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("Duplicate material '{0}'")]
    DuplicateMaterial(String),

    #[error("Geometry {0} has no material and none are declared")]
    NoMaterial(usize),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

pub type DescriptionResult<T> = Result<T, DescriptionError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MaterialDesc {
    Diffuse(DiffuseConfig),
    Metal(MetalConfig),
    Dielectric(DielectricConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMaterial {
    pub name: String,
    #[serde(flatten)]
    pub material: MaterialDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeDesc {
    Sphere(SphereConfig),
    Plane(PlaneConfig),
    Triangle(TriangleConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDesc {
    /// Material name; the first material when omitted.
    #[serde(default)]
    pub material: Option<String>,
    #[serde(flatten)]
    pub shape: ShapeDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LightDesc {
    Point(PointLightConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDesc {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "CameraDesc::default_direction")]
    pub direction: Vec3,
    #[serde(default = "CameraDesc::default_up")]
    pub up: Vec3,
    /// Horizontal field of view in degrees
    #[serde(default = "CameraDesc::default_fov")]
    pub fov: f32,
    #[serde(default = "CameraDesc::default_samples")]
    pub samples: u32,
    #[serde(default)]
    pub ambient: Color,
}

impl CameraDesc {
    fn default_direction() -> Vec3 {
        -Vec3::Z
    }

    fn default_up() -> Vec3 {
        Vec3::Y
    }

    fn default_fov() -> f32 {
        DEFAULT_FOV
    }

    fn default_samples() -> u32 {
        1
    }
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Self::default_direction(),
            up: Self::default_up(),
            fov: Self::default_fov(),
            samples: Self::default_samples(),
            ambient: Color::ZERO,
        }
    }
}

/// Store capacities in floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacity {
    pub materials: usize,
    pub geometries: usize,
    pub lights: usize,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            materials: DEFAULT_STORE_CAPACITY,
            geometries: DEFAULT_STORE_CAPACITY,
            lights: DEFAULT_STORE_CAPACITY,
        }
    }
}

/// A complete scene description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub capacity: Capacity,
    pub materials: Vec<NamedMaterial>,
    pub geometries: Vec<GeometryDesc>,
    pub lights: Vec<LightDesc>,
    pub cameras: Vec<CameraDesc>,
    pub active_camera: usize,
}

impl SceneDescription {
    pub fn from_json_str(json: &str) -> DescriptionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> DescriptionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DescriptionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let desc = Self::from_json_str(&text)?;
        log::info!(
            "Loaded scene description {} ({} materials, {} geometries, {} lights)",
            path.display(),
            desc.materials.len(),
            desc.geometries.len(),
            desc.lights.len()
        );
        Ok(desc)
    }

    /// Build a scene. A description without cameras gets one default camera.
    pub fn build(&self) -> DescriptionResult<Scene> {
        let cap = self.capacity;
        let mut scene = Scene::with_capacity(cap.materials, cap.geometries, cap.lights);

        let mut names = HashMap::new();
        for named in &self.materials {
            let slot = match &named.material {
                MaterialDesc::Diffuse(c) => scene.add_material(c)?,
                MaterialDesc::Metal(c) => scene.add_material(c)?,
                MaterialDesc::Dielectric(c) => scene.add_material(c)?,
            };
            if names.insert(named.name.as_str(), slot).is_some() {
                return Err(DescriptionError::DuplicateMaterial(named.name.clone()));
            }
        }

        for (index, geometry) in self.geometries.iter().enumerate() {
            let material = match &geometry.material {
                Some(name) => *names
                    .get(name.as_str())
                    .ok_or_else(|| DescriptionError::UnknownMaterial(name.clone()))?,
                // Unnamed geometry shades with the first material
                None if !self.materials.is_empty() => 0,
                None => return Err(DescriptionError::NoMaterial(index)),
            };
            match geometry.shape {
                ShapeDesc::Sphere(c) => scene.add_geometry(&c.with_material(material))?,
                ShapeDesc::Plane(c) => scene.add_geometry(&c.with_material(material))?,
                ShapeDesc::Triangle(c) => scene.add_geometry(&c.with_material(material))?,
            };
        }

        for light in &self.lights {
            match light {
                LightDesc::Point(c) => scene.add_light(c)?,
            };
        }

        let cameras = if self.cameras.is_empty() {
            vec![CameraDesc::default()]
        } else {
            self.cameras.clone()
        };
        for desc in &cameras {
            let id = scene.add_camera();
            scene
                .camera_mut(id)?
                .transform(desc.position, desc.direction, desc.up)
                .field_of_view(desc.fov)
                .antialiasing(desc.samples)
                .ambient(desc.ambient);
        }
        scene.activate_camera(self.active_camera)?;

        Ok(scene)
    }
}
