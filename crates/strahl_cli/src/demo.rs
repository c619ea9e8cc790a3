//! Built-in scene used when no description is given.

use strahl_core::{
    DielectricConfig, DiffuseConfig, MetalConfig, Phong, PointLightConfig, Scene, SceneResult,
    SphereConfig,
};
use strahl_math::{Color, Vec3};

/// A diffuse sphere on a huge ground sphere, flanked by metal and glass, under two point lights.
pub fn demo_scene() -> SceneResult<Scene> {
    let mut scene = Scene::new();

    let orange = scene.add_material(
        &DiffuseConfig::new(Color::new(0.9, 0.5, 0.1)).with_phong(Phong::new(1.0, 1.0, 100.0)),
    )?;
    let gray = scene.add_material(&DiffuseConfig::new(Color::splat(0.5)))?;
    let steel = scene.add_material(&MetalConfig::new(Color::new(0.8, 0.8, 0.9), 0.05))?;
    let glass = scene.add_material(&DielectricConfig::new(1.5))?;

    scene.add_geometry(&SphereConfig::new(Vec3::new(0.0, 0.0, -3.0), 0.5).with_material(orange))?;
    scene.add_geometry(&SphereConfig::new(Vec3::new(1.2, 0.0, -3.4), 0.5).with_material(steel))?;
    scene.add_geometry(&SphereConfig::new(Vec3::new(-1.2, 0.0, -3.4), 0.5).with_material(glass))?;
    scene.add_geometry(
        &SphereConfig::new(Vec3::new(0.0, -100.5, -3.0), 100.0).with_material(gray),
    )?;

    scene.add_light(&PointLightConfig::new(Vec3::new(0.0, 1.0, 0.0), Color::splat(0.5)))?;
    scene.add_light(&PointLightConfig::new(Vec3::new(-2.0, 3.0, -1.0), Color::splat(0.5)))?;

    let camera = scene.add_camera();
    scene
        .camera_mut(camera)?
        .transform(Vec3::new(0.0, 0.3, 0.0), Vec3::new(0.0, -0.1, -1.0), Vec3::Y)
        .field_of_view(70.0)
        .antialiasing(4)
        .ambient(Color::splat(0.05));

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strahl_renderer::{render, Background, ExecutionMode, RenderSettings};

    #[test]
    fn test_demo_scene_renders() {
        let scene = demo_scene().unwrap();
        assert_eq!(scene.geometries().len(), 4);
        assert_eq!(scene.lights().len(), 2);

        let settings = RenderSettings::default()
            .with_max_depth(3)
            .with_background(Background::sky())
            .with_mode(ExecutionMode::Parallel);
        let (w, h) = (24, 16);
        let mut pixels = vec![0u8; w * h * 4];
        render(&scene, &mut pixels, w as u32, h as u32, &settings).unwrap();

        assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
        assert!(pixels.chunks_exact(4).any(|p| p[0] > 0));
    }
}
