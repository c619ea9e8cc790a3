// Re-export glam for convenience
pub use glam::*;

// Strahl math types
mod ray;
mod vector;

pub use ray::Ray;
pub use vector::{
    approx_eq, clamp, gen_f32, mirror, normalize, random_in_unit_ball, reflect, refract, rotate,
    Color, EPS,
};
