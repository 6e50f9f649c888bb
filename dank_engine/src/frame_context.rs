//! Per-frame aggregate passed to the scene and the renderer.

use crate::input::InputState;
use crate::resource::{MeshLibrary, TextureLibrary};
use crate::scene::DrawList;

/// Everything one frame reads and writes
///
/// Owned by the `Engine`. The scene mutates it during `Scene::update`, then
/// the renderer reads it during `Renderer::render`; the two never overlap.
#[derive(Default)]
pub struct FrameContext {
    /// When set, timing stops advancing (input and scene still update)
    pub paused: bool,
    /// Seconds since the previous frame (0 while paused)
    pub delta_time: f32,
    /// Frames counted during the last full second
    pub frames_per_second: u32,
    /// Seconds of unpaused time since start
    pub absolute_time: f32,
    /// Unpaused frames since start
    pub absolute_frame: u64,
    pub draw_list: DrawList,
    pub meshes: MeshLibrary,
    pub textures: TextureLibrary,
    pub input: InputState,
}

impl FrameContext {
    pub fn new() -> Self {
        Self::default()
    }
}
