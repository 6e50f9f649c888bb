/// GPU records written per frame: instance data and indirect draw commands

use bytemuck::{Pod, Zeroable};
use crate::graphics_device::{BufferFormat, InstanceLayout, VertexAttribute};
use crate::scene::DrawableInstance;

/// One instance record, read by the vertex shader as per-instance input
///
/// ```text
/// offset  0  transform  (4 x vec4, column-major)   locations 0..=3
/// offset 64  color      vec4                       location  4
/// offset 80  mesh_index u32                        location  5
/// offset 84  texture_slot u32                      location  6
/// offset 88  padding
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuInstance {
    pub transform: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// Buffer index of the mesh descriptor the instance draws
    pub mesh_index: u32,
    /// Fragment table slot of the instance's texture
    pub texture_slot: u32,
    pub _padding: [u32; 2],
}

impl GpuInstance {
    pub fn new(instance: &DrawableInstance, mesh_index: u32, texture_slot: u32) -> Self {
        Self {
            transform: instance.transform.to_cols_array_2d(),
            color: instance.color.to_array(),
            mesh_index,
            texture_slot,
            _padding: [0; 2],
        }
    }

    /// Vertex input layout matching this record
    pub fn layout() -> InstanceLayout {
        let column = |location: u32| VertexAttribute {
            location,
            format: BufferFormat::R32G32B32A32_SFLOAT,
            offset: location * 16,
        };
        InstanceLayout {
            stride: std::mem::size_of::<Self>() as u32,
            attributes: vec![
                column(0),
                column(1),
                column(2),
                column(3),
                VertexAttribute { location: 4, format: BufferFormat::R32G32B32A32_SFLOAT, offset: 64 },
                VertexAttribute { location: 5, format: BufferFormat::R32_UINT, offset: 80 },
                VertexAttribute { location: 6, format: BufferFormat::R32_UINT, offset: 84 },
            ],
        }
    }
}

/// Indexed indirect draw arguments (Vulkan / D3D12 / Metal layout)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectCommand {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}
