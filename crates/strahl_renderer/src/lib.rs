//! Strahl Renderer - evaluators over the packed scene buffers.
//!
//! Three ways to turn a `Scene` into RGBA8 pixels:
//!
//! - **Sequential**: one host thread, pixel by pixel
//! - **Parallel**: bucket spiral on the rayon pool
//! - **Device**: a wgpu compute kernel reading the same arenas (feature `device`)
//!
//! Host evaluators seed one random stream per pixel, so sequential and
//! parallel frames are byte-identical for the same seed.

mod bucket;
mod renderer;
mod settings;
mod tracer;

#[cfg(feature = "device")]
pub mod device;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use renderer::{
    color_to_rgba, linear_to_gamma, pixel_rng, render, render_pixel, render_world, Framebuffer,
    RenderError, RenderResult, RenderStats,
};
#[cfg(feature = "device")]
pub use renderer::render_with_device;
pub use settings::{Background, ExecutionMode, RenderSettings};
pub use tracer::ray_color;

/// Re-export math types from strahl_math
pub use strahl_math::{Color, Vec3};
