//! Scene: three packed stores plus cameras.
//!
//! Construction goes through [`Scene`]; evaluation goes through
//! [`SceneView`], a read-only decoding layer over the same buffers that
//! can also be rebuilt from raw arenas handed in from elsewhere.

use strahl_math::{mirror, normalize, Color, Vec3, EPS};
use thiserror::Error;

use crate::camera::{Camera, CameraId, SceneId};
use crate::geometry::{Geometry, GeometryKind, ShapeConfig, MATERIAL_FIELD};
use crate::light::{Light, LightKind};
use crate::material::{Material, MaterialKind};
use crate::store::{ObjectStore, RecordConfig, StoreError, StoreView};

/// Default capacity of each store, in floats.
pub const DEFAULT_STORE_CAPACITY: usize = 1024;

/// Errors that can occur while building or querying a scene.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Camera {id} does not exist (scene has {len} cameras)")]
    CameraOutOfRange { id: CameraId, len: usize },

    #[error("Scene has no camera")]
    NoCamera,

    #[error("Scene {id} does not exist (world has {len} scenes)")]
    SceneOutOfRange { id: SceneId, len: usize },

    #[error("World has no active scene")]
    NoScene,
}

pub type SceneResult<T> = Result<T, SceneError>;

/// A renderable scene.
#[derive(Debug, Clone)]
pub struct Scene {
    id: SceneId,
    materials: ObjectStore<MaterialKind>,
    geometries: ObjectStore<GeometryKind>,
    lights: ObjectStore<LightKind>,
    cameras: Vec<Camera>,
    active_camera: Option<CameraId>,
}

impl Scene {
    /// Create an empty scene with default store capacities.
    pub fn new() -> Self {
        Self::with_capacity(
            DEFAULT_STORE_CAPACITY,
            DEFAULT_STORE_CAPACITY,
            DEFAULT_STORE_CAPACITY,
        )
    }

    /// Create an empty scene with explicit store capacities (in floats).
    pub fn with_capacity(materials: usize, geometries: usize, lights: usize) -> Self {
        Self {
            id: 0,
            materials: ObjectStore::with_capacity(materials),
            geometries: ObjectStore::with_capacity(geometries),
            lights: ObjectStore::with_capacity(lights),
            cameras: Vec::new(),
            active_camera: None,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Rebind this scene (and its cameras) to a new world id.
    pub(crate) fn attach(&mut self, id: SceneId) {
        self.id = id;
        for camera in &mut self.cameras {
            camera.attach(id);
        }
    }

    pub fn add_material<C>(&mut self, config: &C) -> SceneResult<usize>
    where
        C: RecordConfig<Kind = MaterialKind>,
    {
        Ok(self.materials.allocate(config)?)
    }

    /// Add a geometry. Its material slot must already exist.
    pub fn add_geometry<C: ShapeConfig>(&mut self, config: &C) -> SceneResult<usize> {
        self.materials.get(config.material())?;
        Ok(self.geometries.allocate(config)?)
    }

    pub fn add_light<C>(&mut self, config: &C) -> SceneResult<usize>
    where
        C: RecordConfig<Kind = LightKind>,
    {
        Ok(self.lights.allocate(config)?)
    }

    /// Point a geometry at a material.
    pub fn assign_material(&mut self, geometry: usize, material: usize) -> SceneResult<()> {
        self.materials.get(material)?;
        let (_, mut window) = self.geometries.get_mut(geometry)?;
        window.write_slot(MATERIAL_FIELD, material);
        Ok(())
    }

    /// Add a camera. The first camera added becomes active.
    pub fn add_camera(&mut self) -> CameraId {
        let id = self.cameras.len();
        self.cameras.push(Camera::new(self.id, id));
        log::info!("Created camera {} of scene {}", id, self.id);
        if self.active_camera.is_none() {
            self.active_camera = Some(id);
        }
        id
    }

    pub fn activate_camera(&mut self, id: CameraId) -> SceneResult<()> {
        self.camera(id)?;
        self.active_camera = Some(id);
        log::info!("Activated camera {} of scene {}", id, self.id);
        Ok(())
    }

    pub fn camera(&self, id: CameraId) -> SceneResult<&Camera> {
        let len = self.cameras.len();
        self.cameras
            .get(id)
            .ok_or(SceneError::CameraOutOfRange { id, len })
    }

    pub fn camera_mut(&mut self, id: CameraId) -> SceneResult<&mut Camera> {
        let len = self.cameras.len();
        self.cameras
            .get_mut(id)
            .ok_or(SceneError::CameraOutOfRange { id, len })
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn active_camera_id(&self) -> Option<CameraId> {
        self.active_camera
    }

    /// The active camera, or [`SceneError::NoCamera`].
    pub fn active_camera(&self) -> SceneResult<&Camera> {
        match self.active_camera {
            Some(id) => self.camera(id),
            None => Err(SceneError::NoCamera),
        }
    }

    pub fn materials(&self) -> &ObjectStore<MaterialKind> {
        &self.materials
    }

    pub fn geometries(&self) -> &ObjectStore<GeometryKind> {
        &self.geometries
    }

    pub fn lights(&self) -> &ObjectStore<LightKind> {
        &self.lights
    }

    /// Read-only evaluation view, shading from the given ambient base color.
    pub fn view(&self, ambient: Color) -> SceneView<'_> {
        SceneView::new(
            self.materials.view(),
            self.geometries.view(),
            self.lights.view(),
            ambient,
        )
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest intersection found by [`SceneView::cast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub geometry: Geometry,
}

/// Decoding layer used by the evaluators.
#[derive(Debug, Clone)]
pub struct SceneView<'a> {
    materials: StoreView<'a, MaterialKind>,
    geometries: StoreView<'a, GeometryKind>,
    lights: StoreView<'a, LightKind>,
    ambient: Color,
}

impl<'a> SceneView<'a> {
    pub fn new(
        materials: StoreView<'a, MaterialKind>,
        geometries: StoreView<'a, GeometryKind>,
        lights: StoreView<'a, LightKind>,
        ambient: Color,
    ) -> Self {
        Self {
            materials,
            geometries,
            lights,
            ambient,
        }
    }

    pub fn ambient(&self) -> Color {
        self.ambient
    }

    /// Nearest forward hit across every geometry (linear scan).
    ///
    /// Equal distances keep the geometry enumerated first.
    pub fn cast(&self, origin: Vec3, direction: Vec3) -> Option<Hit> {
        let mut nearest: Option<Hit> = None;
        for record in self.geometries.iter() {
            let geometry = Geometry::decode(&record);
            if let Some(t) = geometry.cast(origin, direction) {
                if nearest.map_or(true, |hit| t < hit.t) {
                    nearest = Some(Hit { t, geometry });
                }
            }
        }
        nearest
    }

    /// Material at `slot`, or `None` for a dangling reference.
    pub fn material(&self, slot: usize) -> Option<Material> {
        self.materials.get(slot).map(|r| Material::decode(&r))
    }

    pub fn lights(&self) -> impl Iterator<Item = Light> + '_ {
        self.lights.iter().map(|r| Light::decode(&r))
    }

    /// Direct illumination at `point`: ambient plus the Phong response to
    /// every light with an unobstructed line of sight.
    ///
    /// `view_dir` is the direction of the ray that arrived at `point`.
    pub fn light_color(
        &self,
        point: Vec3,
        view_dir: Vec3,
        normal: Vec3,
        material: &Material,
    ) -> Color {
        let view_dir = normalize(view_dir);
        let mut color = self.ambient;

        for light in self.lights() {
            let to_light = light.direction(point);
            let distance_squared = light.distance_squared(point);

            let lambert = to_light.dot(normal);
            if lambert <= EPS {
                continue;
            }

            if let Some(hit) = self.cast(point, to_light) {
                if hit.t * hit.t <= distance_squared {
                    continue;
                }
            }

            let diffuse = lambert * material.diffuse(point);
            let base = -mirror(to_light, normal).dot(view_dir) * material.specular(point);
            let specular = if base > 0.0 {
                base.powf(material.shininess(point))
            } else {
                0.0
            };

            color += light.color(point) * (diffuse + specular);
        }

        color
    }
}
