/// Renderer trait - platform renderer lifecycle seen by the host

use crate::error::{Error, Result};
use crate::frame_context::FrameContext;
use crate::scene::Scene;

// ============================================================================
// Configuration
// ============================================================================

/// How draws are encoded into the frame's command list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawEncoding {
    /// One indexed draw per instance
    #[default]
    Direct,
    /// One indirect draw reading a per-frame command buffer
    Indirect,
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Number of frame slots (frames in flight)
    pub frames_in_flight: u32,
    pub draw_encoding: DrawEncoding,
    /// Instance / indirect buffers grow by whole pages of this many records
    pub instance_page_size: u32,
    /// Capacity of the fragment texture table
    pub max_texture_slots: u32,
    /// Render target clear color (RGBA)
    pub clear_color: [f32; 4],
    /// FIFO presentation when true
    pub vsync: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Dank Application".to_string(),
            app_version: (1, 0, 0),
            frames_in_flight: 3,
            draw_encoding: DrawEncoding::Direct,
            instance_page_size: 1024,
            max_texture_slots: 128,
            clear_color: [1.0, 0.042, 0.042, 1.0],
            vsync: true,
        }
    }
}

impl RendererConfig {
    /// Reject configurations the frame pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("frames_in_flight", self.frames_in_flight),
            ("instance_page_size", self.instance_page_size),
            ("max_texture_slots", self.max_texture_slots),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::InitializationFailed(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Frames submitted and presented
    pub frames_presented: u64,
    /// Frames skipped because no render target was available
    pub frames_skipped: u64,
    /// Draw commands recorded in the last presented frame
    pub draw_calls: u32,
    /// Instances drawn in the last presented frame
    pub instances: u32,
    /// Draw list entries skipped in the last frame (inactive texture or unknown mesh)
    pub skipped_draws: u32,
    /// Triangles drawn in the last presented frame
    pub triangles: u32,
    /// Mesh rebakes uploaded since creation
    pub mesh_uploads: u64,
    /// Texture uploads since creation
    pub texture_uploads: u64,
    /// Argument table writes since creation
    pub encodes: u64,
    /// Textures currently bound for drawing
    pub active_textures: u32,
}

/// Result of one `Renderer::render` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// No render target this tick; retried on the next call
    Skipped,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Main renderer trait
pub trait Renderer {
    /// Set up for a view of the given size, or re-validate the surface on resize
    fn init_or_update_view(&mut self, width: u32, height: u32) -> Result<()>;

    /// Sync resources from the frame context and draw its draw list
    ///
    /// # Arguments
    ///
    /// * `ctx` - Frame context holding the libraries and the draw list
    /// * `scene` - Scene providing the camera
    fn render(&mut self, ctx: &FrameContext, scene: &dyn Scene) -> Result<FrameOutcome>;

    /// Wait for the GPU and release every GPU object the renderer owns
    fn release(&mut self) -> Result<()>;

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
