//! CPU-side mesh library.
//!
//! Meshes are stored by id and baked on demand into one contiguous vertex
//! blob and one contiguous index blob. Every mutation bumps the library's
//! `last_modified` counter so GPU caches can skip re-uploads cheaply.
//!
//! # Bake layout
//!
//! ```text
//! id 1: Triangle   vertices 0..3   indices [0,1,2]
//! id 2: Rectangle  vertices 3..7   indices [3,4,5,5,6,3]   (rebased by +3)
//! ```

use std::collections::BTreeMap;
use bytemuck::{Pod, Zeroable};
use crate::engine_warn;

// ============================================================================
// IDS AND VERTEX DATA
// ============================================================================

/// Stable mesh identifier (key of the mesh library)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u32);

/// Interleaved vertex layout shared by every mesh
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }
}

const FACING: [f32; 3] = [0.0, 0.0, 1.0];

/// Geometry produced by a mesh source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

// ============================================================================
// MESH SOURCES
// ============================================================================

/// A source of mesh geometry
///
/// Implementations are asked for their data every time the library is
/// baked, so they should be cheap and deterministic.
pub trait Mesh: Send + Sync {
    fn data(&self) -> MeshData;
}

/// Single triangle spanning the unit square
#[derive(Debug, Clone, Copy, Default)]
pub struct TriangleMesh;

impl Mesh for TriangleMesh {
    fn data(&self) -> MeshData {
        MeshData {
            vertices: vec![
                Vertex::new([-1.0, -1.0, 0.0], FACING, [0.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0], FACING, [0.0, 1.0]),
                Vertex::new([1.0, -1.0, 0.0], FACING, [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2],
        }
    }
}

/// Unit quad made of two triangles
#[derive(Debug, Clone, Copy, Default)]
pub struct RectangleMesh;

impl Mesh for RectangleMesh {
    fn data(&self) -> MeshData {
        MeshData {
            vertices: vec![
                Vertex::new([-1.0, -1.0, 0.0], FACING, [0.0, 0.0]),
                Vertex::new([1.0, -1.0, 0.0], FACING, [1.0, 0.0]),
                Vertex::new([1.0, 1.0, 0.0], FACING, [1.0, 1.0]),
                Vertex::new([-1.0, 1.0, 0.0], FACING, [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }
}

/// Pixel rectangle inside a texture, used to cut sprites out of an atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl TextureRegion {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height, scale: 1.0 }
    }
}

/// Quad sized to a texture region, with UVs mapping that region
#[derive(Debug, Clone, Copy)]
pub struct SpriteMesh {
    texture_width: u32,
    texture_height: u32,
    region: TextureRegion,
}

impl SpriteMesh {
    /// Build a sprite over a texture of `texture_width` x `texture_height` pixels
    pub fn new(texture_width: u32, texture_height: u32, region: TextureRegion) -> Self {
        Self { texture_width, texture_height, region }
    }

    pub fn region(&self) -> TextureRegion {
        self.region
    }
}

impl Mesh for SpriteMesh {
    fn data(&self) -> MeshData {
        let tw = self.texture_width.max(1) as f32;
        let th = self.texture_height.max(1) as f32;
        let r = self.region;

        let x0 = r.x / tw;
        let y0 = r.y / th;
        let x1 = x0 + r.width / tw;
        let y1 = y0 + r.height / th;
        let nx = r.width * r.scale / 2.0;
        let ny = r.height * r.scale / 2.0;

        MeshData {
            vertices: vec![
                Vertex::new([-nx, -ny, 0.0], FACING, [x0, y1]),
                Vertex::new([nx, -ny, 0.0], FACING, [x1, y1]),
                Vertex::new([nx, ny, 0.0], FACING, [x1, y0]),
                Vertex::new([-nx, ny, 0.0], FACING, [x0, y0]),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }
}

// ============================================================================
// DESCRIPTORS AND BAKE OUTPUT
// ============================================================================

/// Location of one mesh inside the baked blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDescriptor {
    pub mesh: MeshId,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
    /// Index of the vertex blob in the vertex-stage binding table
    pub buffer_index: u32,
}

/// Result of `MeshLibrary::bake`
#[derive(Debug, Clone, Default)]
pub struct BakedMeshes {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub descriptors: BTreeMap<MeshId, MeshDescriptor>,
}

impl BakedMeshes {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ============================================================================
// MESH LIBRARY
// ============================================================================

/// Id-keyed store of mesh sources with a modification counter
#[derive(Default)]
pub struct MeshLibrary {
    meshes: BTreeMap<MeshId, Box<dyn Mesh>>,
    last_modified: u64,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the mesh stored under `id`
    pub fn add<M: Mesh + 'static>(&mut self, id: MeshId, mesh: M) {
        self.meshes.insert(id, Box::new(mesh));
        self.last_modified += 1;
    }

    /// Insert a mesh under the next id after the highest one in use
    pub fn insert<M: Mesh + 'static>(&mut self, mesh: M) -> MeshId {
        let id = self
            .meshes
            .keys()
            .next_back()
            .map_or(MeshId(1), |last| MeshId(last.0 + 1));
        self.add(id, mesh);
        id
    }

    pub fn remove(&mut self, id: MeshId) -> bool {
        let removed = self.meshes.remove(&id).is_some();
        if removed {
            self.last_modified += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
        self.last_modified += 1;
    }

    pub fn get(&self, id: MeshId) -> Option<&dyn Mesh> {
        self.meshes.get(&id).map(|m| m.as_ref())
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.meshes.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = MeshId> + '_ {
        self.meshes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Modification counter, strictly increasing across mutations
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// Concatenate every mesh in id order into one vertex and one index blob.
    ///
    /// Indices are rebased by the number of vertices baked before the mesh.
    /// A mesh that references a vertex it does not own is left out of the
    /// bake (and logged), so every baked index stays below the baked vertex
    /// count.
    pub fn bake(&self) -> BakedMeshes {
        let mut baked = BakedMeshes::default();

        for (&id, mesh) in &self.meshes {
            let data = mesh.data();
            let vertex_count = data.vertices.len() as u32;

            if let Some(bad) = data.indices.iter().find(|&&i| i >= vertex_count) {
                engine_warn!("dank::MeshLibrary",
                    "Mesh {} skipped: index {} out of range for {} vertices",
                    id.0, bad, vertex_count);
                continue;
            }

            let vertex_offset = baked.vertices.len() as u32;
            let index_offset = baked.indices.len() as u32;

            baked.indices.extend(data.indices.iter().map(|i| i + vertex_offset));
            baked.vertices.extend_from_slice(&data.vertices);

            baked.descriptors.insert(id, MeshDescriptor {
                mesh: id,
                vertex_offset,
                vertex_count,
                index_offset,
                index_count: data.indices.len() as u32,
                buffer_index: 0,
            });
        }

        baked
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
