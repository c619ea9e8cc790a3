//! Geometric primitives stored in the packed geometry store.
//!
//! Layouts (floats, offset 0 always holds the material slot):
//!
//! | kind     | id | size | fields                         |
//! |----------|----|------|--------------------------------|
//! | Sphere   | 0  | 5    | material, center(3), radius    |
//! | Plane    | 1  | 7    | material, origin(3), normal(3) |
//! | Triangle | 2  | 10   | material, a(3), b(3), c(3)     |

use serde::{Deserialize, Serialize};
use strahl_math::{normalize, Vec3, EPS};

use crate::store::{Record, RecordConfig, RecordKind, WindowMut};

/// Offset of the material slot inside every geometry record.
pub const MATERIAL_FIELD: usize = 0;

/// Geometry variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Sphere,
    Plane,
    Triangle,
}

impl RecordKind for GeometryKind {
    const FAMILY: &'static str = "geometry";

    fn type_id(self) -> u32 {
        match self {
            GeometryKind::Sphere => 0,
            GeometryKind::Plane => 1,
            GeometryKind::Triangle => 2,
        }
    }

    fn from_type_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(GeometryKind::Sphere),
            1 => Some(GeometryKind::Plane),
            2 => Some(GeometryKind::Triangle),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            GeometryKind::Sphere => 5,
            GeometryKind::Plane => 7,
            GeometryKind::Triangle => 10,
        }
    }
}

/// Sphere parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereConfig {
    pub center: Vec3,
    pub radius: f32,
    #[serde(skip)]
    pub material: usize,
}

impl SphereConfig {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            material: 0,
        }
    }

    /// Set the material slot.
    pub fn with_material(mut self, material: usize) -> Self {
        self.material = material;
        self
    }
}

impl RecordConfig for SphereConfig {
    type Kind = GeometryKind;

    fn kind(&self) -> GeometryKind {
        GeometryKind::Sphere
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write_slot(MATERIAL_FIELD, self.material);
        window.write_vec3(1, self.center);
        window.write(4, self.radius);
    }
}

/// Geometry config that names the material slot it shades with.
pub trait ShapeConfig: RecordConfig<Kind = GeometryKind> {
    fn material(&self) -> usize;
}

impl ShapeConfig for SphereConfig {
    fn material(&self) -> usize {
        self.material
    }
}

/// Infinite plane through `origin` with the given normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub origin: Vec3,
    pub normal: Vec3,
    #[serde(skip)]
    pub material: usize,
}

impl PlaneConfig {
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Self {
            origin,
            normal,
            material: 0,
        }
    }

    pub fn with_material(mut self, material: usize) -> Self {
        self.material = material;
        self
    }
}

impl RecordConfig for PlaneConfig {
    type Kind = GeometryKind;

    fn kind(&self) -> GeometryKind {
        GeometryKind::Plane
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write_slot(MATERIAL_FIELD, self.material);
        window.write_vec3(1, self.origin);
        window.write_vec3(4, normalize(self.normal));
    }
}

impl ShapeConfig for PlaneConfig {
    fn material(&self) -> usize {
        self.material
    }
}

/// Triangle with vertices `a`, `b`, `c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangleConfig {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    #[serde(skip)]
    pub material: usize,
}

impl TriangleConfig {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            a,
            b,
            c,
            material: 0,
        }
    }

    pub fn with_material(mut self, material: usize) -> Self {
        self.material = material;
        self
    }
}

impl RecordConfig for TriangleConfig {
    type Kind = GeometryKind;

    fn kind(&self) -> GeometryKind {
        GeometryKind::Triangle
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write_slot(MATERIAL_FIELD, self.material);
        window.write_vec3(1, self.a);
        window.write_vec3(4, self.b);
        window.write_vec3(7, self.c);
    }
}

impl ShapeConfig for TriangleConfig {
    fn material(&self) -> usize {
        self.material
    }
}

/// Shape parameters decoded from a geometry record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Plane { origin: Vec3, normal: Vec3 },
    Triangle { a: Vec3, b: Vec3, c: Vec3 },
}

/// A decoded geometry record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Slot in the geometry store.
    pub slot: usize,
    /// Slot of the referenced material.
    pub material: usize,
    pub shape: Shape,
}

impl Geometry {
    /// Decode a packed record by switching on its kind.
    pub fn decode(record: &Record<'_, GeometryKind>) -> Self {
        let w = &record.window;
        let shape = match record.kind {
            GeometryKind::Sphere => Shape::Sphere {
                center: w.read_vec3(1),
                radius: w.read(4),
            },
            GeometryKind::Plane => Shape::Plane {
                origin: w.read_vec3(1),
                normal: w.read_vec3(4),
            },
            GeometryKind::Triangle => Shape::Triangle {
                a: w.read_vec3(1),
                b: w.read_vec3(4),
                c: w.read_vec3(7),
            },
        };
        Self {
            slot: record.slot,
            material: w.read_slot(MATERIAL_FIELD),
            shape,
        }
    }

    /// Ray parameter of the nearest forward intersection, if any.
    pub fn cast(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        match self.shape {
            Shape::Sphere { center, radius } => cast_sphere(center, radius, origin, direction),
            Shape::Plane { origin: p, normal } => cast_plane(p, normal, origin, direction),
            Shape::Triangle { a, b, c } => cast_triangle(a, b, c, origin, direction),
        }
    }

    /// Unit surface normal at a point assumed to lie on the surface.
    ///
    /// Planes and triangles report the normal on the side of `point`.
    pub fn normal(&self, point: Vec3) -> Vec3 {
        match self.shape {
            Shape::Sphere { center, radius } => (point - center) / radius,
            Shape::Plane { origin, normal } => facing(normal, point - origin),
            Shape::Triangle { a, b, c } => facing(triangle_normal(a, b, c), point - a),
        }
    }
}

/// Flip `normal` so it points toward the side `offset` lies on.
#[inline]
fn facing(normal: Vec3, offset: Vec3) -> Vec3 {
    if offset.dot(normal) < 0.0 {
        -normal
    } else {
        normal
    }
}

#[inline]
fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    normalize((a - b).cross(a - c))
}

/// Ray/sphere intersection via the numerically stable quadratic.
///
/// Returns the smallest root above `EPS`, so a ray starting inside the
/// sphere reports the exit point.
pub fn cast_sphere(center: Vec3, radius: f32, origin: Vec3, direction: Vec3) -> Option<f32> {
    let oc = origin - center;
    let a = direction.dot(direction);
    let b = 2.0 * direction.dot(oc);
    let c = oc.dot(oc) - radius * radius;
    let discr = b * b - 4.0 * a * c;

    if discr < 0.0 || a <= 0.0 {
        return None;
    }

    if discr == 0.0 {
        let t = -0.5 * b / a;
        return (t > EPS).then_some(t);
    }

    let root = discr.sqrt();
    let q = if b > 0.0 {
        -0.5 * (b + root)
    } else {
        -0.5 * (b - root)
    };
    let (t0, t1) = (q / a, c / q);
    let (near, far) = if t0 < t1 { (t0, t1) } else { (t1, t0) };

    if near > EPS {
        Some(near)
    } else if far > EPS {
        Some(far)
    } else {
        None
    }
}

/// Ray/plane intersection against the face looking at the ray origin.
pub fn cast_plane(point: Vec3, normal: Vec3, origin: Vec3, direction: Vec3) -> Option<f32> {
    let n = facing(normal, origin - point);
    let denom = n.dot(direction);
    if denom >= -EPS {
        return None;
    }
    let t = (point - origin).dot(n) / denom;
    (t >= EPS).then_some(t)
}

/// Ray/triangle intersection: plane hit followed by the same-side edge test.
pub fn cast_triangle(a: Vec3, b: Vec3, c: Vec3, origin: Vec3, direction: Vec3) -> Option<f32> {
    let t = cast_plane(a, triangle_normal(a, b, c), origin, direction)?;
    let p = origin + direction * t;

    // Unnormalized winding normal; each edge cross product must agree with it.
    let n = (b - a).cross(c - a);
    let inside = (b - a).cross(p - a).dot(n) >= 0.0
        && (c - b).cross(p - b).dot(n) >= 0.0
        && (a - c).cross(p - c).dot(n) >= 0.0;

    inside.then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sphere(center: Vec3, radius: f32) -> Geometry {
        Geometry {
            slot: 0,
            material: 0,
            shape: Shape::Sphere { center, radius },
        }
    }

    #[test]
    fn test_sphere_hit_from_outside() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let center = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let radius = rng.gen_range(0.1..3.0);
            let origin = center
                + Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
                .normalize()
                    * (radius + rng.gen_range(0.5..20.0));
            let dir = (center - origin).normalize();
            let g = sphere(center, radius);

            let t = g.cast(origin, dir).expect("aimed at center");
            let expected = (center - origin).length() - radius;
            assert!((t - expected).abs() < 1e-3, "t={} expected={}", t, expected);

            let p = origin + dir * t;
            let n = g.normal(p);
            assert!((n.length() - 1.0).abs() < 1e-3);
            assert!(n.cross(p - center).length() < 1e-3);
            assert!(n.dot(p - center) > 0.0);
        }
    }

    #[test]
    fn test_sphere_no_self_intersection_outward() {
        let g = sphere(Vec3::ZERO, 1.0);
        assert_eq!(g.cast(Vec3::Z, Vec3::Z), None);
        assert_eq!(g.cast(Vec3::new(0.0, -1.0, 0.0), -Vec3::Y), None);
    }

    #[test]
    fn test_sphere_miss_and_behind() {
        let g = sphere(Vec3::new(0.0, 0.0, 5.0), 1.0);
        assert_eq!(g.cast(Vec3::ZERO, Vec3::X), None);
        assert_eq!(g.cast(Vec3::ZERO, -Vec3::Z), None);
    }

    #[test]
    fn test_sphere_from_inside_reports_exit() {
        let g = sphere(Vec3::ZERO, 2.0);
        let t = g.cast(Vec3::ZERO, Vec3::X).unwrap();
        assert!((t - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_sphere_tangent() {
        let g = sphere(Vec3::new(0.0, 1.0, 5.0), 1.0);
        let t = g.cast(Vec3::ZERO, Vec3::Z).unwrap();
        assert!((t - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_plane_hit_from_either_side() {
        let plane = Geometry {
            slot: 0,
            material: 0,
            shape: Shape::Plane {
                origin: Vec3::ZERO,
                normal: Vec3::Y,
            },
        };

        let t = plane.cast(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
        assert_eq!(plane.normal(Vec3::new(0.0, 1e-3, 0.0)), Vec3::Y);

        let t = plane.cast(Vec3::new(1.0, -3.0, 0.0), Vec3::Y).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
        assert_eq!(plane.normal(Vec3::new(0.0, -1e-3, 0.0)), -Vec3::Y);

        // Parallel and pointing away
        assert_eq!(plane.cast(Vec3::Y, Vec3::X), None);
        assert_eq!(plane.cast(Vec3::Y, Vec3::Y), None);
    }

    #[test]
    fn test_triangle_inside_outside_both_windings() {
        let a = Vec3::new(-1.0, -1.0, 5.0);
        let b = Vec3::new(1.0, -1.0, 5.0);
        let c = Vec3::new(0.0, 1.0, 5.0);

        for (a, b, c) in [(a, b, c), (a, c, b)] {
            let tri = Geometry {
                slot: 0,
                material: 0,
                shape: Shape::Triangle { a, b, c },
            };
            let t = tri.cast(Vec3::ZERO, Vec3::Z).expect("through centroid");
            assert!((t - 5.0).abs() < 1e-4);
            assert!((tri.normal(Vec3::new(0.0, 0.0, 4.9)) + Vec3::Z).length() < 1e-4);

            assert_eq!(tri.cast(Vec3::new(2.0, 0.0, 0.0), Vec3::Z), None);
            assert_eq!(tri.cast(Vec3::new(0.0, 0.0, 10.0), Vec3::Z), None);

            // Also hit from behind
            let t = tri.cast(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z).unwrap();
            assert!((t - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_decode_round_trip_through_store() {
        let mut store = ObjectStore::with_capacity(64);
        store
            .allocate(&SphereConfig::new(Vec3::new(1.0, 2.0, 3.0), 0.5).with_material(4))
            .unwrap();
        store
            .allocate(&PlaneConfig::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        store
            .allocate(&TriangleConfig::new(Vec3::X, Vec3::Y, Vec3::Z).with_material(1))
            .unwrap();
        assert_eq!(store.type_ids(), &[0, 1, 2]);
        assert_eq!(store.filled(), 22);

        let view = store.view();
        let decoded: Vec<Geometry> = view.iter().map(|r| Geometry::decode(&r)).collect();
        assert_eq!(decoded[0].material, 4);
        assert_eq!(
            decoded[0].shape,
            Shape::Sphere {
                center: Vec3::new(1.0, 2.0, 3.0),
                radius: 0.5
            }
        );
        match decoded[1].shape {
            Shape::Plane { normal, .. } => assert!((normal - Vec3::Y).length() < 1e-4),
            other => panic!("expected plane, got {:?}", other),
        }
        assert_eq!(decoded[2].slot, 2);
        assert_eq!(decoded[2].material, 1);
    }
}
