/// GraphicsDevice trait - backend contract used by the frame renderer

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    ArgumentTable, ArgumentTableDesc, Buffer, BufferDesc, CommandList, Fence, Pipeline,
    PipelineDesc, Texture, TextureDesc, TextureFormat,
};

/// State of an acquired render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Owned by the presentation engine
    Present,
    /// Writable color attachment
    RenderTarget,
}

/// Back buffer acquired for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Backend image index
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Graphics device trait
///
/// Factory for GPU resources plus the queue operations the frame pipeline
/// needs. Resources are reference counted; dropping the last handle
/// releases the GPU object, and every resource must be dropped before the
/// device itself.
pub trait GraphicsDevice: Send {
    /// Create a CPU-visible buffer
    ///
    /// # Arguments
    ///
    /// * `desc` - Buffer descriptor (size must be non-zero)
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a sampled 2D texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Copy one full image into a texture (blocking staging upload)
    ///
    /// # Arguments
    ///
    /// * `texture` - Destination texture
    /// * `data` - Tightly packed pixels, `width * height * 4` bytes
    fn write_texture(&mut self, texture: &Arc<dyn Texture>, data: &[u8]) -> Result<()>;

    /// Create an argument table for one shader stage
    fn create_argument_table(&mut self, desc: ArgumentTableDesc) -> Result<Arc<dyn ArgumentTable>>;

    /// Create a fence starting at `initial_value`
    fn create_fence(&mut self, initial_value: u64) -> Result<Arc<dyn Fence>>;

    /// Create a command list for one frame slot
    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>>;

    /// Create the graphics pipeline
    ///
    /// Failure here is fatal for the renderer (`InitializationFailed`).
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Acquire the next back buffer
    ///
    /// Returns `Ok(None)` when the surface is not ready (minimized,
    /// out of date); the frame is skipped.
    fn acquire_render_target(&mut self) -> Result<Option<RenderTarget>>;

    /// Submit a closed command list rendering into `target`
    fn submit(&mut self, commands: &dyn CommandList, target: &RenderTarget) -> Result<()>;

    /// Queue the target for presentation
    fn present(&mut self, target: &RenderTarget) -> Result<()>;

    /// Raise `fence` to `value` once all previously submitted work completes
    fn signal_fence(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()>;

    /// Re-validate the surface for a new view size
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Current surface size
    fn surface_size(&self) -> (u32, u32);

    /// Wait until the GPU is idle
    fn wait_idle(&self) -> Result<()>;

    /// Downcast hook
    fn as_any(&self) -> &dyn Any;
}
