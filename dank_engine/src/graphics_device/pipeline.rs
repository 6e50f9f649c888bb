/// Pipeline trait and pipeline descriptor
///
/// The renderer uses one graphics pipeline: vertices are pulled from the
/// mesh blob in the vertex argument table, per-instance data comes from a
/// vertex buffer stepped per instance, and indices from the baked index
/// buffer. Shaders are host-provided SPIR-V.

use std::any::Any;
use crate::graphics_device::ArgumentTableDesc;

/// Attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_UINT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32G32B32A32_UINT,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT | BufferFormat::R32G32B32A32_UINT => 16,
        }
    }
}

/// One per-instance attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    pub format: BufferFormat,
    /// Byte offset inside one instance record
    pub offset: u32,
}

/// Layout of the per-instance vertex buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// SPIR-V module and its entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub spirv: Vec<u32>,
    pub entry_point: String,
}

impl ShaderSource {
    pub fn new(spirv: Vec<u32>, entry_point: &str) -> Self {
        Self { spirv, entry_point: entry_point.to_string() }
    }

    /// Build from raw little-endian SPIR-V bytes
    pub fn from_bytes(bytes: &[u8], entry_point: &str) -> crate::error::Result<Self> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return Err(crate::error::Error::InitializationFailed(format!(
                "SPIR-V size {} is not a non-zero multiple of 4",
                bytes.len()
            )));
        }
        let spirv = bytes
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect();
        Ok(Self::new(spirv, entry_point))
    }
}

/// Descriptor for creating the graphics pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    pub vertex_shader: ShaderSource,
    pub fragment_shader: ShaderSource,
    pub instance_layout: InstanceLayout,
    /// Table layouts in set order (set 0 = first entry)
    pub argument_tables: Vec<ArgumentTableDesc>,
}

/// Compiled graphics pipeline
pub trait Pipeline: Send + Sync {
    /// Downcast hook for the owning backend
    fn as_any(&self) -> &dyn Any;
}
