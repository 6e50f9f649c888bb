/// Scene trait - the game-side collaborator driven by the engine.

use crate::frame_context::FrameContext;
use super::camera::Camera;

/// Game scene
///
/// `update` runs once per frame, after input and timing have advanced. It
/// owns the contents of `ctx.draw_list` for that frame and may add or
/// remove meshes and textures from the libraries. The engine refreshes the
/// camera matrices right after it returns.
pub trait Scene {
    fn update(&mut self, ctx: &mut FrameContext);

    fn camera(&self) -> &Camera;

    fn camera_mut(&mut self) -> &mut Camera;
}
