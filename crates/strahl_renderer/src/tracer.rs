//! Recursive color resolution for a single ray.
//!
//! Each bounce multiplies the material's attenuation, the direct light at
//! the hit point and the color resolved along the scattered ray, then
//! clamps to [0, 1]. Direct and indirect light are multiplied rather than
//! summed; this is the shading model, not an approximation of one.

use rand::RngCore;
use strahl_core::SceneView;
use strahl_math::{clamp, Color, Ray, Vec3, EPS};

use crate::RenderSettings;

/// Compute the color seen by a ray.
///
/// `depth` counts bounces taken so far; at `settings.max_depth` the ray
/// resolves to black. `up` orients the background gradient.
pub fn ray_color(
    ray: &Ray,
    scene: &SceneView<'_>,
    depth: u32,
    settings: &RenderSettings,
    up: Vec3,
    rng: &mut dyn RngCore,
) -> Color {
    if depth >= settings.max_depth {
        return Color::ZERO;
    }

    let Some(hit) = scene.cast(ray.origin, ray.direction) else {
        return settings.background.color(ray.direction, up);
    };

    // Pull back toward the ray origin so follow-up rays clear the surface
    let point = ray.at(hit.t - EPS);
    let Some(material) = scene.material(hit.geometry.material) else {
        log::warn!(
            "Geometry {} references missing material {}",
            hit.geometry.slot,
            hit.geometry.material
        );
        return Color::ZERO;
    };
    let normal = hit.geometry.normal(point);

    let Some(scattered) = material.scatter(point, ray.direction, normal, rng) else {
        return Color::ZERO;
    };
    let scattered_color = ray_color(&scattered, scene, depth + 1, settings, up, rng);

    let light = scene.light_color(point, ray.direction, normal, &material);
    let attenuation = material.attenuation(point, ray.direction, normal);

    clamp(attenuation * light * scattered_color, 0.0, 1.0)
}
