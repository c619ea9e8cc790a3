//! Strahl command-line renderer.
//!
//! Loads a JSON scene description (or the built-in demo), renders it with
//! the chosen evaluator and writes a PNG.

mod cli;
mod demo;
mod document;

use anyhow::Context;
use clap::Parser;
use cli::Args;
use document::Document;
use strahl_renderer::Framebuffer;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut document = match &args.scene {
        Some(path) => Document::load(path)?,
        None => {
            log::info!("No scene given, using the built-in demo");
            Document::default()
        }
    };
    document.apply(&args);

    let scene = match &args.scene {
        Some(_) => document.build(args.samples)?,
        None => {
            let mut scene = demo::demo_scene().context("Failed to build demo scene")?;
            document::override_samples(&mut scene, args.samples)?;
            scene
        }
    };

    let mut frame = Framebuffer::new(document.image.width, document.image.height);
    let stats = frame.render(&scene, &document.render)?;
    log::info!(
        "{} primary rays in {:.2?} ({} mode)",
        stats.primary_rays,
        stats.elapsed,
        stats.mode
    );

    image::save_buffer(
        &args.output,
        &frame.pixels,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Saved {}", args.output.display());

    Ok(())
}
