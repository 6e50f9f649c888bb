//! CPU-side resource libraries
//!
//! Versioned mesh and texture libraries plus the background fetch pool
//! used by URI textures.

pub mod mesh;
pub mod texture;
pub mod fetch;

pub use mesh::{
    Mesh, MeshId, MeshData, Vertex, MeshDescriptor, MeshLibrary, BakedMeshes,
    TriangleMesh, RectangleMesh, SpriteMesh, TextureRegion,
};
pub use texture::{
    TextureId, ResourceState, PixelFormat, TextureStatus, TextureData, TextureSource,
    TextureLibrary, DebugTexture, UriTexture, CaptureTexture,
};
pub use fetch::{FetchPool, FetchHandle, FetchStatus, FetchTaskKey, DecodedImage, decode_rgba8};
