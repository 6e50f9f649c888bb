/// CommandList trait - for recording rendering commands

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{ArgumentTable, Buffer, Pipeline, RenderTarget, TargetState};

/// Command list for recording rendering commands
///
/// Each frame slot owns one list. It is reset at the start of the slot's
/// frame, recorded, closed, then handed to `GraphicsDevice::submit`.
pub trait CommandList: Send + Sync {
    /// Reset the list (and its allocator) and begin recording
    fn reset(&mut self) -> Result<()>;

    /// Finish recording
    fn close(&mut self) -> Result<()>;

    /// Record a state transition of the render target
    ///
    /// # Arguments
    ///
    /// * `target` - The acquired render target
    /// * `from` - State the target is in
    /// * `to` - State the target must be in for the next commands
    fn transition(&mut self, target: &RenderTarget, from: TargetState, to: TargetState) -> Result<()>;

    /// Begin rendering into the target, clearing it first
    fn begin_render_pass(&mut self, target: &RenderTarget, clear: ClearValue) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind an argument table at the given set index
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout the table matches
    /// * `set_index` - Set index (0 = vertex table, 1 = fragment table)
    /// * `table` - The table to bind
    fn bind_argument_table(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        table: &Arc<dyn ArgumentTable>,
    ) -> Result<()>;

    /// Bind the per-instance vertex buffer
    fn bind_instance_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind a u32 index buffer
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Draw indexed, instanced geometry
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices per instance
    /// * `instance_count` - Number of instances
    /// * `first_index` - Index of the first index in the index buffer
    /// * `vertex_offset` - Value added to every index
    /// * `first_instance` - Instance id of the first instance
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;

    /// Execute `draw_count` indexed draws read from `buffer`
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer of `DrawIndexedIndirectCommand` records
    /// * `offset` - Byte offset of the first record
    /// * `draw_count` - Number of records
    /// * `stride` - Byte distance between records
    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;

    /// Downcast hook for the owning backend
    fn as_any(&self) -> &dyn Any;
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with a [0, 1] depth range
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for the color attachment (RGBA)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValue(pub [f32; 4]);
