//! Vector operations used by intersection and shading code.
//!
//! Arithmetic, dot/cross products and magnitude come straight from
//! [`glam::Vec3`]. This module adds the ray tracing specific pieces:
//! epsilon-stabilised normalisation, reflection about a surface,
//! Snell refraction, Rodrigues rotation and unit-ball sampling.

use glam::Vec3;
use rand::RngCore;

/// Tolerance used for self-intersection rejection and approximate comparisons.
pub const EPS: f32 = 1e-5;

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// Uniform float in [0, 1) drawn from a type-erased RNG.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Normalize with a stabilised denominator.
///
/// Vectors already within `EPS` of unit length are returned untouched,
/// zero-length input yields zero instead of NaN.
#[inline]
pub fn normalize(v: Vec3) -> Vec3 {
    let n2 = v.length_squared();
    if (n2 - 1.0).abs() <= EPS {
        return v;
    }
    v * (1.0 / (n2.sqrt() + EPS))
}

/// Mirror `v` across the plane with normal `n`: `v - 2(v·n)n`.
///
/// Preserves magnitude and flips the normal component, so
/// `reflect(v, n)·n == -(v·n)`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Mirror `v` about the axis `n`: `2(v·n)n - v`.
///
/// This is the reflection of a direction pointing *away* from the surface,
/// e.g. the outgoing direction of a mirror given the reversed incoming ray.
#[inline]
pub fn mirror(v: Vec3, n: Vec3) -> Vec3 {
    -reflect(v, n)
}

/// Refract unit direction `v` through a surface with unit normal `n`
/// facing against `v`, where `eta` is the ratio of the refractive index
/// on the incoming side to the one on the far side.
///
/// Returns `None` on total internal reflection.
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -v.dot(n);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some(eta * v + (eta * cos_i - k.sqrt()) * n)
}

/// Rotate `v` around `axis` by `angle` radians (Rodrigues' formula).
pub fn rotate(v: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let k = normalize(axis);
    let (sin, cos) = angle.sin_cos();
    v * cos + k.cross(v) * sin + k * k.dot(v) * (1.0 - cos)
}

/// Per-component clamp.
#[inline]
pub fn clamp(v: Vec3, lo: f32, hi: f32) -> Vec3 {
    v.clamp(Vec3::splat(lo), Vec3::splat(hi))
}

/// Epsilon-tolerant equality for geometric tests.
#[inline]
pub fn approx_eq(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() <= EPS * 10.0
}

/// Uniform point strictly inside the unit ball, by rejection from `[-1, 1]^3`.
pub fn random_in_unit_ball(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
