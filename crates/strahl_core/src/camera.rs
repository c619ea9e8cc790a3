//! Scene cameras.
//!
//! A camera never owns its scene: it records the `(SceneId, CameraId)` pair
//! it was created under and is looked up through the scene's camera list.

use strahl_math::{normalize, Color, Ray, Vec2, Vec3};

/// Dense index of a scene inside a [`crate::World`].
pub type SceneId = usize;

/// Dense, zero-based index of a camera inside its scene.
pub type CameraId = usize;

/// Default horizontal field of view in degrees.
pub const DEFAULT_FOV: f32 = 90.0;

/// Pinhole camera with an orthonormal basis.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    scene: SceneId,
    id: CameraId,
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    right: Vec3,
    /// Horizontal field of view in radians
    fov: f32,
    samples: u32,
    ambient: Color,
}

impl Camera {
    /// Camera at the origin looking down -Z with +Y up.
    pub fn new(scene: SceneId, id: CameraId) -> Self {
        let mut camera = Self {
            scene,
            id,
            position: Vec3::ZERO,
            forward: -Vec3::Z,
            up: Vec3::Y,
            right: Vec3::X,
            fov: DEFAULT_FOV.to_radians(),
            samples: 1,
            ambient: Color::ZERO,
        };
        camera.transform(Vec3::ZERO, -Vec3::Z, Vec3::Y);
        camera
    }

    /// Place the camera. `up` is re-orthogonalised against `dir`.
    pub fn transform(&mut self, position: Vec3, dir: Vec3, up: Vec3) -> &mut Self {
        self.position = position;
        self.forward = normalize(dir);
        let mut right = normalize(self.forward.cross(up));
        if right.length_squared() < 0.5 {
            // `up` parallel to `dir`
            right = self.forward.any_orthonormal_vector();
        }
        self.right = right;
        self.up = right.cross(self.forward);
        self
    }

    /// Set the horizontal field of view in degrees.
    pub fn field_of_view(&mut self, degrees: f32) -> &mut Self {
        self.fov = degrees.to_radians();
        self
    }

    /// Set the number of samples per pixel (at least one).
    pub fn antialiasing(&mut self, samples: u32) -> &mut Self {
        self.samples = samples.max(1);
        self
    }

    /// Set the base color every shaded point starts from.
    pub fn ambient(&mut self, color: Color) -> &mut Self {
        self.ambient = color;
        self
    }

    pub fn scene_id(&self) -> SceneId {
        self.scene
    }

    pub fn id(&self) -> CameraId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Horizontal field of view in radians.
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn ambient_color(&self) -> Color {
        self.ambient
    }

    pub(crate) fn attach(&mut self, scene: SceneId) {
        self.scene = scene;
    }

    /// Primary ray through pixel `(x, y)` of a `width` x `height` image.
    ///
    /// `(0, 0)` is the top-left pixel. `jitter` is a sub-pixel offset in
    /// `[-1, 1]` per axis, spanning the pixel footprint; zero goes through
    /// the pixel centre.
    pub fn ray(&self, x: u32, y: u32, width: u32, height: u32, jitter: Vec2) -> Ray {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let px = x as f32 + 0.5 + 0.5 * jitter.x;
        let py = y as f32 + 0.5 + 0.5 * jitter.y;

        // Normalized offsets from the image centre, in [-1, 1]
        let u = 2.0 * px / w - 1.0;
        let v = 1.0 - 2.0 * py / h;

        let half_h = 0.5 * self.fov;
        let half_v = half_h * h / w;

        let direction = normalize(self.forward + self.right * (u * half_h) + self.up * (v * half_v));
        Ray::new(self.position, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let camera = Camera::new(0, 0);
        assert_eq!(camera.samples(), 1);
        assert!((camera.fov() - 90f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.ambient_color(), Color::ZERO);
        assert_eq!(camera.forward(), -Vec3::Z);
        assert_eq!(camera.up(), Vec3::Y);
        assert_eq!(camera.right(), Vec3::X);
    }

    #[test]
    fn test_transform_orthonormalizes() {
        let mut camera = Camera::new(0, 0);
        camera.transform(Vec3::ONE, Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 1.0, 1.0));
        assert!((camera.forward() - Vec3::Z).length() < 1e-4);
        assert!((camera.up() - Vec3::Y).length() < 1e-3);
        assert!(camera.right().dot(camera.forward()).abs() < 1e-4);
        assert!(camera.right().dot(camera.up()).abs() < 1e-4);

        // Degenerate up still yields a basis
        camera.transform(Vec3::ZERO, Vec3::Y, Vec3::Y);
        assert!((camera.right().length() - 1.0).abs() < 1e-3);
        assert!(camera.right().dot(Vec3::Y).abs() < 1e-4);
    }

    #[test]
    fn test_antialiasing_minimum() {
        let mut camera = Camera::new(0, 0);
        camera.antialiasing(0);
        assert_eq!(camera.samples(), 1);
        camera.antialiasing(8).field_of_view(60.0);
        assert_eq!(camera.samples(), 8);
        assert!((camera.fov() - 60f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_center_and_corner_rays() {
        let camera = Camera::new(0, 0);

        // Odd resolution: the middle pixel looks straight ahead
        let center = camera.ray(50, 50, 101, 101, Vec2::ZERO);
        assert!((center.direction - -Vec3::Z).length() < 1e-4);

        // Top-left pixel looks up and to the left
        let corner = camera.ray(0, 0, 101, 101, Vec2::ZERO);
        assert!(corner.direction.x < 0.0);
        assert!(corner.direction.y > 0.0);

        // Bottom-right looks down and to the right
        let corner = camera.ray(100, 100, 101, 101, Vec2::ZERO);
        assert!(corner.direction.x > 0.0);
        assert!(corner.direction.y < 0.0);
    }

    #[test]
    fn test_jitter_stays_near_pixel() {
        let camera = Camera::new(0, 0);
        let base = camera.ray(10, 10, 64, 64, Vec2::ZERO).direction;
        let jittered = camera.ray(10, 10, 64, 64, Vec2::new(1.0, -1.0)).direction;
        let neighbour = camera.ray(12, 10, 64, 64, Vec2::ZERO).direction;
        assert!(base.distance(jittered) < base.distance(neighbour));
    }
}
