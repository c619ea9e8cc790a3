//! Strahl Core - packed scene representation.
//!
//! This crate provides:
//!
//! - **Packed object stores**: fixed-capacity float arenas of typed records
//!   that a host loop and a compute kernel read identically
//! - **Scene objects**: spheres, planes, triangles; diffuse, metal and
//!   dielectric materials; point lights
//! - **Scene and camera state**, owned by a scoped `World`
//! - **JSON scene descriptions**
//!
//! # Example
//!
//! ```
//! use strahl_core::{DiffuseConfig, Scene, SphereConfig};
//! use strahl_math::{Color, Vec3};
//!
//! let mut scene = Scene::new();
//! let white = scene.add_material(&DiffuseConfig::new(Color::ONE))?;
//! scene.add_geometry(&SphereConfig::new(Vec3::new(0.0, 0.0, -5.0), 0.5).with_material(white))?;
//! scene.add_camera();
//!
//! let hit = scene.view(Color::ZERO).cast(Vec3::ZERO, -Vec3::Z);
//! assert!(hit.is_some());
//! # Ok::<(), strahl_core::SceneError>(())
//! ```

pub mod camera;
pub mod description;
pub mod geometry;
pub mod light;
pub mod material;
pub mod scene;
pub mod store;
pub mod world;

// Re-export commonly used types
pub use camera::{Camera, CameraId, SceneId};
pub use description::{DescriptionError, SceneDescription};
pub use geometry::{
    Geometry, GeometryKind, PlaneConfig, Shape, ShapeConfig, SphereConfig, TriangleConfig,
};
pub use light::{Light, LightKind, PointLightConfig};
pub use material::{DielectricConfig, DiffuseConfig, Material, MaterialKind, MetalConfig, Phong};
pub use scene::{Hit, Scene, SceneError, SceneResult, SceneView};
pub use store::{ObjectStore, RecordConfig, RecordKind, StoreError, StoreView};
pub use world::World;
