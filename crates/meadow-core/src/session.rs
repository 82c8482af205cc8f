//! Session state: the ordered model list and the saved default camera

use glam::Vec3;
use tracing::{debug, info};

use crate::arrange::{arrange_row, Placeable};
use crate::bounds::Aabb3;
use crate::framing::{frame_box, CameraState, FramingOptions};

/// A model placed in the scene.
///
/// `R` is the engine's handle to the model's scene-graph root.
#[derive(Debug, Clone)]
pub struct LoadedModel<R> {
    /// Display label, usually the source file name
    pub name: String,
    pub root: R,
    /// Bounds relative to the root's origin
    pub local_bounds: Aabb3,
    /// Root translation in world space
    pub offset: Vec3,
    /// World bounds, `local_bounds` moved by `offset`
    pub bounds: Aabb3,
}

impl<R> LoadedModel<R> {
    /// New model whose root sits at the world origin
    pub fn new(name: impl Into<String>, root: R, local_bounds: Option<Aabb3>) -> Self {
        // Models without geometry behave like a point at their origin
        let local_bounds = local_bounds.unwrap_or_else(|| Aabb3::from_point(Vec3::ZERO));
        Self {
            name: name.into(),
            root,
            local_bounds,
            offset: Vec3::ZERO,
            bounds: local_bounds,
        }
    }
}

impl<R> Placeable for LoadedModel<R> {
    fn world_bounds(&self) -> Aabb3 {
        self.local_bounds.translated(self.offset)
    }

    fn translate(&mut self, offset: Vec3) {
        self.offset += offset;
    }

    fn set_bounds(&mut self, bounds: Aabb3) {
        self.bounds = bounds;
    }
}

/// Result of a re-layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub union: Aabb3,
    pub camera: CameraState,
    /// True when this framing became the session's default camera
    pub captured_default: bool,
}

/// Ordered models of the current session.
///
/// The default camera is captured on the first framing after a clear and
/// stays fixed until the next clear. `generation` increases on every clear
/// so late import completions can tell they belong to a previous session.
#[derive(Debug)]
pub struct SessionState<R> {
    models: Vec<LoadedModel<R>>,
    default_camera: Option<CameraState>,
    generation: u64,
}

impl<R> Default for SessionState<R> {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            default_camera: None,
            generation: 0,
        }
    }
}

impl<R> SessionState<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[LoadedModel<R>] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether work started under `generation` still belongs to this session
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn default_camera(&self) -> Option<&CameraState> {
        self.default_camera.as_ref()
    }

    /// Append a model in arrival order
    pub fn push(&mut self, model: LoadedModel<R>) {
        debug!(name = %model.name, count = self.models.len() + 1, "Model added to session");
        self.models.push(model);
    }

    /// Re-lay-out every model in a row and frame the camera on the result.
    ///
    /// Returns `None` without touching anything when the session is empty.
    pub fn arrange(&mut self, gap: f32, framing: &FramingOptions) -> Option<Framing> {
        let union = arrange_row(&mut self.models, gap)?;
        let camera = frame_box(union.center(), union.size(), framing);

        let captured_default = self.default_camera.is_none();
        if captured_default {
            info!(
                position = ?camera.position,
                target = ?camera.target,
                "Default camera captured"
            );
            self.default_camera = Some(camera);
        }

        Some(Framing {
            union,
            camera,
            captured_default,
        })
    }

    /// Empty the session and start a new one.
    ///
    /// The removed models are handed back so the caller can release their
    /// engine resources. Clearing an empty session still starts a new
    /// generation and is otherwise a no-op.
    pub fn clear(&mut self) -> Vec<LoadedModel<R>> {
        self.default_camera = None;
        self.generation += 1;
        let removed = std::mem::take(&mut self.models);
        if !removed.is_empty() {
            info!(count = removed.len(), generation = self.generation, "Session cleared");
        }
        removed
    }
}
