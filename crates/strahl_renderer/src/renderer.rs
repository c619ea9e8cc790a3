//! Frame rendering on the host, and dispatch between evaluators.
//!
//! Implements:
//! - Per-pixel multi-sampling with sub-pixel jitter
//! - Gamma correction
//! - Sequential, bucketed parallel and device execution

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use strahl_core::{Camera, Scene, SceneError, SceneView, World};
use strahl_math::{gen_f32, Color, Vec2};
use thiserror::Error;

use crate::bucket::{generate_buckets, render_bucket, BucketResult};
use crate::tracer::ray_color;
use crate::{ExecutionMode, RenderSettings};

#[cfg(feature = "device")]
use crate::device::DeviceRenderer;

/// Host-only builds never hold a device.
#[cfg(not(feature = "device"))]
enum DeviceRenderer {}

/// Errors that fail a whole frame.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Summary of a finished frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    /// Evaluator that actually produced the pixels
    pub mode: ExecutionMode,
    pub elapsed: Duration,
    /// Camera rays generated (pixels times samples)
    pub primary_rays: u64,
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b, 255]
}

/// Random stream for one pixel, independent of evaluation order.
pub fn pixel_rng(seed: u64, pixel_index: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ pixel_index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Render a single pixel, averaging the camera's samples.
///
/// The first sample goes through the pixel centre, later ones are jittered
/// by a uniform offset in [-1, 1] per axis.
pub fn render_pixel(
    scene: &SceneView<'_>,
    camera: &Camera,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> Color {
    let mut rng = pixel_rng(settings.seed, y as u64 * width as u64 + x as u64);
    let samples = camera.samples().max(1);
    let mut pixel_color = Color::ZERO;

    for sample in 0..samples {
        let jitter = if sample == 0 {
            Vec2::ZERO
        } else {
            Vec2::new(gen_f32(&mut rng) * 2.0 - 1.0, gen_f32(&mut rng) * 2.0 - 1.0)
        };
        let ray = camera.ray(x, y, width, height, jitter);
        pixel_color += ray_color(&ray, scene, 0, settings, camera.up(), &mut rng);
    }

    pixel_color / samples as f32
}

/// Owned RGBA8 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA, row-major, top row first
    pub pixels: Vec<u8>,
}

impl Framebuffer {
    /// Create a new framebuffer filled with transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Render the scene's active camera into this framebuffer.
    pub fn render(&mut self, scene: &Scene, settings: &RenderSettings) -> RenderResult<RenderStats> {
        render(scene, &mut self.pixels, self.width, self.height, settings)
    }
}

/// Render the scene's active camera into `pixels`.
///
/// `pixels` must hold exactly `width * height * 4` bytes. The store must
/// not be mutated while this runs; the borrow checker enforces that here.
pub fn render(
    scene: &Scene,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> RenderResult<RenderStats> {
    render_frame(scene, pixels, width, height, settings, None)
}

/// Like [`render`], but device mode reuses `device` instead of acquiring
/// an adapter and compiling the kernel for every frame.
#[cfg(feature = "device")]
pub fn render_with_device(
    device: &DeviceRenderer,
    scene: &Scene,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> RenderResult<RenderStats> {
    render_frame(scene, pixels, width, height, settings, Some(device))
}

fn render_frame(
    scene: &Scene,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
    device: Option<&DeviceRenderer>,
) -> RenderResult<RenderStats> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(RenderError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }

    let camera = scene.active_camera()?;
    let start = Instant::now();
    log::info!(
        "Rendering scene {} camera {}: {}x{}, {} spp, depth {}, {} mode",
        scene.id(),
        camera.id(),
        width,
        height,
        camera.samples(),
        settings.max_depth,
        settings.mode
    );

    let view = scene.view(camera.ambient_color());
    let mode = match settings.mode {
        ExecutionMode::Sequential => {
            render_sequential(&view, camera, pixels, width, height, settings);
            ExecutionMode::Sequential
        }
        ExecutionMode::Parallel => {
            render_parallel(&view, camera, pixels, width, height, settings);
            ExecutionMode::Parallel
        }
        ExecutionMode::Device => {
            render_device(device, scene, &view, camera, pixels, width, height, settings)
        }
    };

    let stats = RenderStats {
        mode,
        elapsed: start.elapsed(),
        primary_rays: width as u64 * height as u64 * camera.samples() as u64,
    };
    log::info!("Rendered in {:.2?} ({} mode)", stats.elapsed, stats.mode);
    Ok(stats)
}

/// Render the world's active scene.
pub fn render_world(
    world: &World,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> RenderResult<RenderStats> {
    render(world.active_scene()?, pixels, width, height, settings)
}

fn render_sequential(
    view: &SceneView<'_>,
    camera: &Camera,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) {
    for y in 0..height {
        for x in 0..width {
            let color = render_pixel(view, camera, x, y, width, height, settings);
            let i = (y as usize * width as usize + x as usize) * 4;
            pixels[i..i + 4].copy_from_slice(&color_to_rgba(color));
        }
    }
}

fn render_parallel(
    view: &SceneView<'_>,
    camera: &Camera,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) {
    let buckets = generate_buckets(width, height, settings.bucket_size);
    let total = buckets.len();

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let colors = render_bucket(bucket, view, camera, width, height, settings);
            log::debug!("Bucket {}/{} done", bucket.index + 1, total);
            BucketResult::new(*bucket, colors)
        })
        .collect();

    for result in results {
        let b = result.bucket;
        for (local, color) in result.pixels.iter().enumerate() {
            let x = b.x + local as u32 % b.width;
            let y = b.y + local as u32 / b.width;
            let i = (y as usize * width as usize + x as usize) * 4;
            pixels[i..i + 4].copy_from_slice(&color_to_rgba(*color));
        }
    }
}

#[cfg(feature = "device")]
#[allow(clippy::too_many_arguments)]
fn render_device(
    device: Option<&DeviceRenderer>,
    scene: &Scene,
    view: &SceneView<'_>,
    camera: &Camera,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> ExecutionMode {
    let result = match device {
        Some(device) => device.render(scene, camera, pixels, width, height, settings),
        None => DeviceRenderer::new()
            .and_then(|device| device.render(scene, camera, pixels, width, height, settings)),
    };
    match result {
        Ok(()) => ExecutionMode::Device,
        Err(e) => {
            log::warn!("Device evaluation unavailable ({}), falling back to sequential", e);
            render_sequential(view, camera, pixels, width, height, settings);
            ExecutionMode::Sequential
        }
    }
}

#[cfg(not(feature = "device"))]
#[allow(clippy::too_many_arguments)]
fn render_device(
    _device: Option<&DeviceRenderer>,
    _scene: &Scene,
    view: &SceneView<'_>,
    camera: &Camera,
    pixels: &mut [u8],
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> ExecutionMode {
    log::warn!("Built without the device feature, falling back to sequential");
    render_sequential(view, camera, pixels, width, height, settings);
    ExecutionMode::Sequential
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Background;
    use strahl_core::{DiffuseConfig, Phong, PointLightConfig, SphereConfig, TriangleConfig};
    use strahl_math::Vec3;

    const SIZE: u32 = 41;

    /// White diffuse sphere of radius 0.5 five units ahead, lit from behind the camera.
    fn lit_sphere_scene() -> Scene {
        let mut scene = Scene::new();
        let white = scene
            .add_material(&DiffuseConfig::new(Color::ONE).with_phong(Phong::new(1.0, 0.0, 1.0)))
            .unwrap();
        scene
            .add_geometry(&SphereConfig::new(Vec3::new(0.0, 0.0, -5.0), 0.5).with_material(white))
            .unwrap();
        scene
            .add_light(&PointLightConfig::new(Vec3::new(0.0, 0.0, 1.0), Color::splat(0.6)))
            .unwrap();
        let camera = scene.add_camera();
        scene
            .camera_mut(camera)
            .unwrap()
            .transform(Vec3::ZERO, -Vec3::Z, Vec3::Y)
            .field_of_view(20.0);
        scene
    }

    fn settings(mode: ExecutionMode) -> RenderSettings {
        RenderSettings::default()
            .with_max_depth(2)
            .with_background(Background::Flat(Color::ONE))
            .with_mode(mode)
            .with_seed(7)
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Color::ONE), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::new(0.25, 2.0, -1.0)), [127, 255, 0, 255]);
    }

    #[test]
    fn test_buffer_size_checked() {
        let scene = lit_sphere_scene();
        let mut pixels = vec![0u8; 10];
        let err = render(&scene, &mut pixels, 4, 4, &settings(ExecutionMode::Sequential)).unwrap_err();
        assert!(matches!(err, RenderError::BufferSize { expected: 64, actual: 10, .. }));
    }

    #[test]
    fn test_no_camera() {
        let scene = Scene::new();
        let mut pixels = vec![0u8; 4];
        let err = render(&scene, &mut pixels, 1, 1, &settings(ExecutionMode::Sequential)).unwrap_err();
        assert!(matches!(err, RenderError::Scene(SceneError::NoCamera)));
    }

    #[test]
    fn test_lit_disc_dims_toward_silhouette() {
        let scene = lit_sphere_scene();
        let mut frame = Framebuffer::new(SIZE, SIZE);
        let stats = frame.render(&scene, &settings(ExecutionMode::Sequential)).unwrap();
        assert_eq!(stats.mode, ExecutionMode::Sequential);
        assert_eq!(stats.primary_rays, (SIZE * SIZE) as u64);

        let mid = SIZE / 2;
        let background = [255, 255, 255, 255];

        // Corners see the background
        for (x, y) in [(0, 0), (SIZE - 1, 0), (0, SIZE - 1), (SIZE - 1, SIZE - 1)] {
            assert_eq!(frame.get(x, y), background);
        }

        // Centre is lit but darker than the white background
        let centre = frame.get(mid, mid);
        assert!(centre[0] > 100 && centre[0] < 255, "centre {:?}", centre);
        assert_eq!(centre[3], 255);

        // Walking right from the centre, brightness never increases until
        // the silhouette is crossed
        let mut previous = centre[0];
        let mut x = mid + 1;
        while x < SIZE && frame.get(x, mid) != background {
            let value = frame.get(x, mid)[0];
            assert!(value <= previous, "x={} value={} previous={}", x, value, previous);
            previous = value;
            x += 1;
        }
        assert!(x > mid + 2, "disc too small to test");
        assert!(x < SIZE, "disc fills the frame");
        assert!(previous < centre[0]);
    }

    #[test]
    fn test_single_sample_goes_through_pixel_centre() {
        let scene = lit_sphere_scene();
        let camera = scene.active_camera().unwrap();
        let view = scene.view(camera.ambient_color());
        let config = settings(ExecutionMode::Sequential);

        for (x, y) in [(SIZE / 2, SIZE / 2), (SIZE / 2 + 3, SIZE / 2 - 2), (0, 0)] {
            let mut rng = pixel_rng(config.seed, (y * SIZE + x) as u64);
            let ray = camera.ray(x, y, SIZE, SIZE, Vec2::ZERO);
            let expected = ray_color(&ray, &view, 0, &config, camera.up(), &mut rng);
            assert_eq!(render_pixel(&view, camera, x, y, SIZE, SIZE, &config), expected);
        }
    }

    #[test]
    fn test_samples_average_across_an_edge() {
        // One-pixel frame whose footprint is crossed by the vertical edge of a
        // triangle at u = 0.25. With a single bounce every hit resolves to
        // black and every miss to the white background.
        let mut scene = Scene::new();
        let surface = scene.add_material(&DiffuseConfig::new(Color::ONE)).unwrap();
        scene
            .add_geometry(
                &TriangleConfig::new(
                    Vec3::new(1.0, -50.0, -5.0),
                    Vec3::new(1.0, 50.0, -5.0),
                    Vec3::new(-50.0, 0.0, -5.0),
                )
                .with_material(surface),
            )
            .unwrap();
        let id = scene.add_camera();
        scene
            .camera_mut(id)
            .unwrap()
            .transform(Vec3::ZERO, -Vec3::Z, Vec3::Y)
            .field_of_view(90.0);
        let config = settings(ExecutionMode::Sequential).with_max_depth(1);

        let camera = scene.active_camera().unwrap().clone();
        let view = scene.view(camera.ambient_color());
        assert_eq!(render_pixel(&view, &camera, 0, 0, 1, 1, &config), Color::ZERO);

        scene.camera_mut(id).unwrap().antialiasing(32);
        let camera = scene.active_camera().unwrap();
        let view = scene.view(camera.ambient_color());
        let color = render_pixel(&view, camera, 0, 0, 1, 1, &config);
        assert!(color.x > 0.0 && color.x < 1.0, "edge pixel {:?}", color);
        assert_eq!(color.x, color.y);
        assert_eq!(color.y, color.z);

        // Averages of 32 binary samples land on multiples of 1/32
        let misses = color.x * 32.0;
        assert!((misses - misses.round()).abs() < 1e-4);
    }

    #[test]
    fn test_uniform_background_unchanged_by_sampling() {
        let background = Color::new(0.25, 0.5, 0.75);
        let mut scene = Scene::new();
        let id = scene.add_camera();
        let config = settings(ExecutionMode::Sequential).with_background(Background::Flat(background));

        for samples in [1, 2, 5, 16] {
            scene.camera_mut(id).unwrap().antialiasing(samples);
            let camera = scene.active_camera().unwrap();
            let view = scene.view(camera.ambient_color());
            for (x, y) in [(0, 0), (3, 1), (SIZE - 1, SIZE - 1)] {
                let color = render_pixel(&view, camera, x, y, SIZE, SIZE, &config);
                assert_eq!(color, background, "{} samples at ({}, {})", samples, x, y);
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut scene = lit_sphere_scene();
        scene.camera_mut(0).unwrap().antialiasing(4);

        let mut sequential = Framebuffer::new(SIZE, SIZE);
        sequential.render(&scene, &settings(ExecutionMode::Sequential)).unwrap();

        let mut parallel = Framebuffer::new(SIZE, SIZE);
        let mut config = settings(ExecutionMode::Parallel);
        config.bucket_size = 8;
        let stats = parallel.render(&scene, &config).unwrap();
        assert_eq!(stats.mode, ExecutionMode::Parallel);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_render_world_uses_active_scene() {
        let mut world = World::new();
        world.add_scene(Scene::new());
        let lit = world.add_scene(lit_sphere_scene());
        world.activate_scene(lit).unwrap();

        let mut pixels = vec![0u8; (SIZE * SIZE * 4) as usize];
        render_world(&world, &mut pixels, SIZE, SIZE, &settings(ExecutionMode::Parallel)).unwrap();
        let mid = ((SIZE / 2 * SIZE + SIZE / 2) * 4) as usize;
        assert!(pixels[mid] < 255);
    }
}
