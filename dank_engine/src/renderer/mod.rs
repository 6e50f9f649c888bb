/// Renderer module - resource sync, binding encoding and frame submission

pub mod renderer;
pub mod instance;
pub mod gpu_mesh_cache;
pub mod gpu_texture_cache;
pub mod binding_encoder;
pub mod frame_pipeline;
pub mod frame_renderer;

pub use renderer::*;
pub use instance::{GpuInstance, DrawIndexedIndirectCommand};
pub use gpu_mesh_cache::GpuMeshCache;
pub use gpu_texture_cache::GpuTextureCache;
pub use binding_encoder::{BindingEncoder, canonical_bytes};
pub use frame_pipeline::{FramePipeline, FrameStage, pages_for};
pub use frame_renderer::{FrameRenderer, vertex_table_desc, fragment_table_desc};
