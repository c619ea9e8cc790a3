//! Point lights stored in the packed light store.
//!
//! Layout: `Point` (id 0, size 6) = color(3), position(3).

use serde::{Deserialize, Serialize};
use strahl_math::{normalize, Color, Vec3};

use crate::store::{Record, RecordConfig, RecordKind, WindowMut};

/// Light variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Point,
}

impl RecordKind for LightKind {
    const FAMILY: &'static str = "light";

    fn type_id(self) -> u32 {
        match self {
            LightKind::Point => 0,
        }
    }

    fn from_type_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(LightKind::Point),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            LightKind::Point => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLightConfig {
    pub position: Vec3,
    pub color: Color,
}

impl PointLightConfig {
    pub fn new(position: Vec3, color: Color) -> Self {
        Self { position, color }
    }
}

impl RecordConfig for PointLightConfig {
    type Kind = LightKind;

    fn kind(&self) -> LightKind {
        LightKind::Point
    }

    fn apply(&self, window: &mut WindowMut<'_>) {
        window.write_vec3(0, self.color);
        window.write_vec3(3, self.position);
    }
}

/// A decoded light record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Omnidirectional light. Intensity does not fall off with distance.
    Point { position: Vec3, color: Color },
}

impl Light {
    pub fn decode(record: &Record<'_, LightKind>) -> Self {
        let w = &record.window;
        match record.kind {
            LightKind::Point => Light::Point {
                color: w.read_vec3(0),
                position: w.read_vec3(3),
            },
        }
    }

    /// Unit vector from `point` toward the light.
    pub fn direction(&self, point: Vec3) -> Vec3 {
        match *self {
            Light::Point { position, .. } => normalize(position - point),
        }
    }

    pub fn distance_squared(&self, point: Vec3) -> f32 {
        match *self {
            Light::Point { position, .. } => (position - point).length_squared(),
        }
    }

    pub fn color(&self, _point: Vec3) -> Color {
        match *self {
            Light::Point { color, .. } => color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;

    #[test]
    fn test_point_light_queries() {
        let mut store = ObjectStore::with_capacity(6);
        store
            .allocate(&PointLightConfig::new(Vec3::new(0.0, 4.0, 0.0), Color::new(1.0, 0.5, 0.25)))
            .unwrap();
        assert_eq!(&store.arena()[..6], &[1.0, 0.5, 0.25, 0.0, 4.0, 0.0]);

        let light = Light::decode(&store.get(0).unwrap());
        let p = Vec3::new(0.0, 1.0, 0.0);
        assert!((light.direction(p) - Vec3::Y).length() < 1e-4);
        assert_eq!(light.distance_squared(p), 9.0);
        // No falloff
        assert_eq!(light.color(Vec3::splat(100.0)), Color::new(1.0, 0.5, 0.25));
    }
}
