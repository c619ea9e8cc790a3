//! Surface materials stored in the packed material store.
//!
//! | kind       | id | size | fields                                        |
//! |------------|----|------|-----------------------------------------------|
//! | Diffuse    | 0  | 6    | color(3), diffuse, specular, shininess        |
//! | Metal      | 1  | 7    | color(3), diffuse, specular, shininess, fuzz  |
//! | Dielectric | 2  | 4    | ior, diffuse, specular, shininess             |
//!
//! Every material answers two questions: how an incoming ray continues
//! ([`Material::scatter`] and [`Material::attenuation`]), and how strongly
//! it responds to direct light (the Phong coefficients).

use rand::RngCore;
use serde::{Deserialize, Serialize};
use strahl_math::{
    gen_f32, mirror, normalize, random_in_unit_ball, reflect, refract, Color, Ray, Vec3, EPS,
};

use crate::store::{Record, RecordConfig, RecordKind, Window, WindowMut};

/// Distance a dielectric pushes its outgoing ray off the surface.
const DIELECTRIC_NUDGE: f32 = 10.0 * EPS;

/// Material variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Diffuse,
    Metal,
    Dielectric,
}

impl RecordKind for MaterialKind {
    const FAMILY: &'static str = "material";

    fn type_id(self) -> u32 {
        match self {
            MaterialKind::Diffuse => 0,
            MaterialKind::Metal => 1,
            MaterialKind::Dielectric => 2,
        }
    }

    fn from_type_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(MaterialKind::Diffuse),
            1 => Some(MaterialKind::Metal),
            2 => Some(MaterialKind::Dielectric),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            MaterialKind::Diffuse => 6,
            MaterialKind::Metal => 7,
            MaterialKind::Dielectric => 4,
        }
    }
}

/// Phong coefficients used for direct lighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phong {
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for Phong {
    fn default() -> Self {
        Self {
            diffuse: 1.0,
            specular: 0.0,
            shininess: 1.0,
        }
    }
}

impl Phong {
    pub fn new(diffuse: f32, specular: f32, shininess: f32) -> Self {
        Self {
            diffuse,
            specular,
            shininess,
        }
    }

    fn write(&self, window: &mut WindowMut<'_>, at: usize) {
        window.write(at, self.diffuse);
        window.write(at + 1, self.specular);
        window.write(at + 2, self.shininess);
    }

    fn read(window: &Window<'_>, at: usize) -> Self {
        Self::new(window.read(at), window.read(at + 1), window.read(at + 2))
    }
}

/// Lambertian-style diffuse surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffuseConfig {
    pub color: Color,
    #[serde(default)]
    pub phong: Phong,
}

impl DiffuseConfig {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            phong: Phong::default(),
        }
    }

    pub fn with_phong(mut self, phong: Phong) -> Self {
        self.phong = phong;
        self
    }
}

impl RecordConfig for DiffuseConfig {
    type Kind = MaterialKind;

    fn kind(&self) -> MaterialKind {
        MaterialKind::Diffuse
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write_vec3(0, self.color);
        self.phong.write(window, 3);
    }
}

/// Reflective metal. `fuzz` of 0 is a perfect mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetalConfig {
    pub color: Color,
    #[serde(default)]
    pub fuzz: f32,
    #[serde(default)]
    pub phong: Phong,
}

impl MetalConfig {
    pub fn new(color: Color, fuzz: f32) -> Self {
        Self {
            color,
            fuzz,
            phong: Phong::default(),
        }
    }

    pub fn with_phong(mut self, phong: Phong) -> Self {
        self.phong = phong;
        self
    }
}

impl RecordConfig for MetalConfig {
    type Kind = MaterialKind;

    fn kind(&self) -> MaterialKind {
        MaterialKind::Metal
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write_vec3(0, self.color);
        self.phong.write(window, 3);
        window.write(6, self.fuzz);
    }
}

/// Clear refractive material (glass, water).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DielectricConfig {
    pub ior: f32,
    #[serde(default)]
    pub phong: Phong,
}

impl DielectricConfig {
    pub fn new(ior: f32) -> Self {
        Self {
            ior,
            phong: Phong::default(),
        }
    }

    pub fn with_phong(mut self, phong: Phong) -> Self {
        self.phong = phong;
        self
    }
}

impl RecordConfig for DielectricConfig {
    type Kind = MaterialKind;

    fn kind(&self) -> MaterialKind {
        MaterialKind::Dielectric
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write(0, self.ior);
        self.phong.write(window, 1);
    }
}

/// A decoded material record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Diffuse { albedo: Color, phong: Phong },
    Metal { albedo: Color, fuzz: f32, phong: Phong },
    Dielectric { ior: f32, phong: Phong },
}

impl Material {
    /// Decode a packed record by switching on its kind.
    pub fn decode(record: &Record<'_, MaterialKind>) -> Self {
        let w = &record.window;
        match record.kind {
            MaterialKind::Diffuse => Material::Diffuse {
                albedo: w.read_vec3(0),
                phong: Phong::read(w, 3),
            },
            MaterialKind::Metal => Material::Metal {
                albedo: w.read_vec3(0),
                phong: Phong::read(w, 3),
                fuzz: w.read(6),
            },
            MaterialKind::Dielectric => Material::Dielectric {
                ior: w.read(0),
                phong: Phong::read(w, 1),
            },
        }
    }

    /// Decide whether and where the ray continues after hitting `point`.
    ///
    /// `normal` is the geometric normal at the hit; `incoming` the direction
    /// of the arriving ray. `None` means the ray is absorbed.
    pub fn scatter(
        &self,
        point: Vec3,
        incoming: Vec3,
        normal: Vec3,
        rng: &mut dyn RngCore,
    ) -> Option<Ray> {
        match *self {
            Material::Diffuse { .. } => {
                let mut direction = normalize(normal + random_in_unit_ball(rng));
                // Catch degenerate scatter direction
                if direction.length_squared() < 1e-8 {
                    direction = normal;
                }
                Some(Ray::new(point, direction))
            }
            Material::Metal { fuzz, .. } => {
                let unit = normalize(incoming);
                let direction = normalize(mirror(-unit, normal) + fuzz * random_in_unit_ball(rng));
                (direction.dot(normal) > 0.0).then(|| Ray::new(point, direction))
            }
            Material::Dielectric { ior, .. } => Some(scatter_dielectric(point, incoming, normal, ior, rng)),
        }
    }

    /// Multiplicative factor applied to the scattered ray's color.
    pub fn attenuation(&self, _point: Vec3, _incoming: Vec3, _normal: Vec3) -> Color {
        match *self {
            Material::Diffuse { albedo, .. } | Material::Metal { albedo, .. } => albedo,
            Material::Dielectric { .. } => Color::ONE,
        }
    }

    pub fn diffuse(&self, _point: Vec3) -> f32 {
        self.phong().diffuse
    }

    pub fn specular(&self, _point: Vec3) -> f32 {
        self.phong().specular
    }

    pub fn shininess(&self, _point: Vec3) -> f32 {
        self.phong().shininess
    }

    fn phong(&self) -> Phong {
        match *self {
            Material::Diffuse { phong, .. }
            | Material::Metal { phong, .. }
            | Material::Dielectric { phong, .. } => phong,
        }
    }
}

/// Schlick's approximation for reflectance
pub fn schlick(cosine: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

fn scatter_dielectric(
    point: Vec3,
    incoming: Vec3,
    normal: Vec3,
    ior: f32,
    rng: &mut dyn RngCore,
) -> Ray {
    let unit = normalize(incoming);
    let exiting = unit.dot(normal) > 0.0;
    let (n, eta) = if exiting {
        (-normal, ior)
    } else {
        (normal, 1.0 / ior)
    };
    let cos_theta = (-unit.dot(n)).min(1.0);

    match refract(unit, n, eta) {
        Some(direction) if gen_f32(rng) >= schlick(cos_theta, ior) => {
            Ray::new(point - n * DIELECTRIC_NUDGE, normalize(direction))
        }
        _ => Ray::new(point + n * DIELECTRIC_NUDGE, reflect(unit, n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use strahl_math::approx_eq;

    #[test]
    fn test_diffuse_always_scatters_above_surface() {
        let mat = Material::Diffuse {
            albedo: Color::new(0.5, 0.5, 0.5),
            phong: Phong::default(),
        };
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let ray = mat
                .scatter(Vec3::ZERO, -Vec3::Y, Vec3::Y, &mut rng)
                .expect("diffuse never absorbs");
            assert!(ray.direction.dot(Vec3::Y) > 0.0);
            assert!((ray.direction.length() - 1.0).abs() < 1e-3);
        }
        assert_eq!(mat.attenuation(Vec3::ZERO, -Vec3::Y, Vec3::Y), Color::splat(0.5));
    }

    #[test]
    fn test_metal_mirror_reflection() {
        let mat = Material::Metal {
            albedo: Color::ONE,
            fuzz: 0.0,
            phong: Phong::default(),
        };
        let mut rng = StdRng::seed_from_u64(42);
        let incoming = Vec3::new(1.0, -1.0, 0.0).normalize();
        let ray = mat.scatter(Vec3::ZERO, incoming, Vec3::Y, &mut rng).unwrap();
        assert!(approx_eq(ray.direction, Vec3::new(1.0, 1.0, 0.0).normalize()));
    }

    #[test]
    fn test_metal_absorbs_below_surface() {
        let mat = Material::Metal {
            albedo: Color::ONE,
            fuzz: 0.0,
            phong: Phong::default(),
        };
        let mut rng = StdRng::seed_from_u64(42);
        // Arriving from behind the normal reflects into the surface
        assert!(mat.scatter(Vec3::ZERO, Vec3::Y, Vec3::Y, &mut rng).is_none());
    }

    #[test]
    fn test_dielectric_unit_ior_passes_straight_through() {
        let mat = Material::Dielectric {
            ior: 1.0,
            phong: Phong::default(),
        };
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let ray = mat.scatter(Vec3::ZERO, -Vec3::Y, Vec3::Y, &mut rng).unwrap();
            assert!(approx_eq(ray.direction, -Vec3::Y));
            // Origin pushed through the surface, never reflected back
            assert!(ray.origin.y < 0.0);
        }
        assert_eq!(mat.attenuation(Vec3::ZERO, -Vec3::Y, Vec3::Y), Color::ONE);
    }

    #[test]
    fn test_dielectric_total_internal_reflection() {
        let mat = Material::Dielectric {
            ior: 1.5,
            phong: Phong::default(),
        };
        let mut rng = StdRng::seed_from_u64(42);
        // Exiting at a grazing angle
        let incoming = Vec3::new(0.9, 0.1, 0.0).normalize();
        for _ in 0..50 {
            let ray = mat.scatter(Vec3::ZERO, incoming, Vec3::Y, &mut rng).unwrap();
            assert!(ray.direction.y < 0.0);
            assert!(ray.origin.y < 0.0);
            assert!((ray.direction.x - incoming.x).abs() < 1e-4);
        }
    }

    #[test]
    fn test_schlick() {
        assert_eq!(schlick(1.0, 1.0), 0.0);
        assert!((schlick(1.0, 1.5) - 0.04).abs() < 1e-4);
        assert!((schlick(0.0, 1.5) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_layouts() {
        let mut store = ObjectStore::with_capacity(32);
        store
            .allocate(&DiffuseConfig::new(Color::new(0.1, 0.2, 0.3)).with_phong(Phong::new(0.8, 0.5, 16.0)))
            .unwrap();
        store.allocate(&MetalConfig::new(Color::ONE, 0.25)).unwrap();
        store.allocate(&DielectricConfig::new(1.5)).unwrap();
        assert_eq!(store.type_ids(), &[0, 1, 2]);
        assert_eq!(store.filled(), 17);

        let view = store.view();
        let diffuse = Material::decode(&view.get(0).unwrap());
        assert_eq!(diffuse.diffuse(Vec3::ZERO), 0.8);
        assert_eq!(diffuse.specular(Vec3::ZERO), 0.5);
        assert_eq!(diffuse.shininess(Vec3::ZERO), 16.0);

        assert!(matches!(
            Material::decode(&view.get(1).unwrap()),
            Material::Metal { fuzz, .. } if fuzz == 0.25
        ));
        assert!(matches!(
            Material::decode(&view.get(2).unwrap()),
            Material::Dielectric { ior, .. } if ior == 1.5
        ));
    }
}
