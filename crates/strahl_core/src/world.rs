//! Scoped owner of scenes.
//!
//! Scene ids are dense indices local to one `World`; there is no
//! process-wide counter.

use crate::camera::SceneId;
use crate::scene::{Scene, SceneError, SceneResult};

#[derive(Debug, Default)]
pub struct World {
    scenes: Vec<Scene>,
    active: Option<SceneId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a scene and return its id.
    ///
    /// The first scene added becomes active.
    pub fn add_scene(&mut self, mut scene: Scene) -> SceneId {
        let id = self.scenes.len();
        scene.attach(id);
        self.scenes.push(scene);
        log::info!("Created scene {}", id);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    pub fn activate_scene(&mut self, id: SceneId) -> SceneResult<()> {
        self.scene(id)?;
        self.active = Some(id);
        log::info!("Activated scene {}", id);
        Ok(())
    }

    pub fn scene(&self, id: SceneId) -> SceneResult<&Scene> {
        let len = self.scenes.len();
        self.scenes
            .get(id)
            .ok_or(SceneError::SceneOutOfRange { id, len })
    }

    pub fn scene_mut(&mut self, id: SceneId) -> SceneResult<&mut Scene> {
        let len = self.scenes.len();
        self.scenes
            .get_mut(id)
            .ok_or(SceneError::SceneOutOfRange { id, len })
    }

    pub fn active_scene(&self) -> SceneResult<&Scene> {
        match self.active {
            Some(id) => self.scene(id),
            None => Err(SceneError::NoScene),
        }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
