/// Buffer trait and buffer descriptor

use std::any::Any;
use bitflags::bitflags;
use crate::error::Result;

bitflags! {
    /// How a buffer is bound on the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Per-instance vertex input
        const VERTEX   = 1 << 0;
        /// Index buffer (u32 indices)
        const INDEX    = 1 << 1;
        /// Uniform/constant buffer
        const UNIFORM  = 1 << 2;
        /// Storage buffer read by shaders
        const STORAGE  = 1 << 3;
        /// Source of indirect draw commands
        const INDIRECT = 1 << 4;
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Buffer resource trait
///
/// Buffers are CPU-visible and written in place. Implemented by
/// backend-specific buffer types (e.g., VulkanBuffer); the GPU memory is
/// released when the last handle is dropped.
pub trait Buffer: Send + Sync {
    /// Update buffer data
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    ///
    /// # Errors
    ///
    /// `InvalidResource` when `offset + data.len()` exceeds the buffer size.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Backend handle, stable for the lifetime of the buffer
    fn handle(&self) -> u64;

    /// Downcast hook for the owning backend
    fn as_any(&self) -> &dyn Any;
}
