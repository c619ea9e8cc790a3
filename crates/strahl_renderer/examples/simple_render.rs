//! Simple ray tracer example.
//!
//! Renders a ground plane with a field of spheres and saves to PPM format.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strahl_core::{
    DielectricConfig, DiffuseConfig, MetalConfig, PlaneConfig, PointLightConfig, Scene,
    SceneResult, SphereConfig,
};
use strahl_renderer::{render, Color, ExecutionMode, RenderSettings, Vec3};
use std::fs::File;
use std::io::{BufWriter, Write};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 450;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Strahl Ray Tracer - Simple Example");
    println!("==================================");

    let start = std::time::Instant::now();
    let scene = build_scene()?;
    println!(
        "Scene built in {:?} ({} objects)",
        start.elapsed(),
        scene.geometries().len()
    );

    let settings = RenderSettings::default()
        .with_max_depth(10)
        .with_mode(ExecutionMode::Parallel);

    let mut pixels = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    let stats = render(&scene, &mut pixels, WIDTH, HEIGHT, &settings)?;
    println!("Rendered {} rays in {:?}", stats.primary_rays, stats.elapsed);

    let filename = "output.ppm";
    save_ppm(&pixels, WIDTH, HEIGHT, filename)?;
    println!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> SceneResult<Scene> {
    let mut scene = Scene::with_capacity(4096, 4096, 64);

    // Ground
    let ground = scene.add_material(&DiffuseConfig::new(Color::new(0.5, 0.5, 0.5)))?;
    scene.add_geometry(&PlaneConfig::new(Vec3::ZERO, Vec3::Y).with_material(ground))?;

    // Three main spheres
    let glass = scene.add_material(&DielectricConfig::new(1.5))?;
    scene.add_geometry(&SphereConfig::new(Vec3::new(0.0, 1.0, 0.0), 1.0).with_material(glass))?;

    let brown = scene.add_material(&DiffuseConfig::new(Color::new(0.4, 0.2, 0.1)))?;
    scene.add_geometry(&SphereConfig::new(Vec3::new(-4.0, 1.0, 0.0), 1.0).with_material(brown))?;

    let bronze = scene.add_material(&MetalConfig::new(Color::new(0.7, 0.6, 0.5), 0.0))?;
    scene.add_geometry(&SphereConfig::new(Vec3::new(4.0, 1.0, 0.0), 1.0).with_material(bronze))?;

    // Small random spheres
    let mut rng = StdRng::seed_from_u64(42);
    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let choose_mat: f32 = rng.gen();
            let material = if choose_mat < 0.8 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                scene.add_material(&DiffuseConfig::new(albedo))?
            } else if choose_mat < 0.95 {
                let albedo = Color::new(
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                );
                scene.add_material(&MetalConfig::new(albedo, 0.5 * rng.gen::<f32>()))?
            } else {
                glass
            };
            scene.add_geometry(&SphereConfig::new(center, 0.2).with_material(material))?;
        }
    }

    scene.add_light(&PointLightConfig::new(Vec3::new(0.0, 10.0, 5.0), Color::ONE))?;

    let camera = scene.add_camera();
    let from = Vec3::new(13.0, 2.0, 3.0);
    scene
        .camera_mut(camera)?
        .transform(from, Vec3::ZERO - from, Vec3::Y)
        .field_of_view(35.0)
        .antialiasing(16)
        .ambient(Color::splat(0.1));

    Ok(scene)
}

fn save_ppm(pixels: &[u8], width: u32, height: u32, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", width, height)?;
    writeln!(writer, "255")?;

    for rgba in pixels.chunks_exact(4) {
        writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
    }

    Ok(())
}
