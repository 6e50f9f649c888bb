/// GPU mesh cache - mirrors the mesh library into one vertex blob and one
/// index blob.
///
/// The cache compares the library's `last_modified` with the version it
/// last synced. On a mismatch it drops both buffers, rebakes the whole
/// library and uploads the result into exactly-sized new buffers. No diff
/// is attempted: mesh libraries are small and settle after scene setup.

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, GraphicsDevice};
use crate::resource::{MeshDescriptor, MeshId, MeshLibrary};
use crate::engine_debug;

#[derive(Default)]
pub struct GpuMeshCache {
    synced_version: Option<u64>,
    vertex_buffer: Option<Arc<dyn Buffer>>,
    index_buffer: Option<Arc<dyn Buffer>>,
    descriptors: BTreeMap<MeshId, MeshDescriptor>,
    vertex_count: u32,
    index_count: u32,
    upload_count: u64,
}

impl GpuMeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `library` changed since the last sync
    pub fn is_stale(&self, library: &MeshLibrary) -> bool {
        self.synced_version != Some(library.last_modified())
    }

    /// Rebake and upload when the library changed
    ///
    /// Returns `true` when the buffers were replaced, so the caller must
    /// re-encode the bindings that reference them. Callers must make sure
    /// no in-flight frame still reads the previous buffers. A failed upload
    /// leaves the cache unbound and stale, so the next sync retries.
    pub fn sync(&mut self, device: &mut dyn GraphicsDevice, library: &MeshLibrary) -> Result<bool> {
        if !self.is_stale(library) {
            return Ok(false);
        }

        self.vertex_buffer = None;
        self.index_buffer = None;
        self.descriptors.clear();
        self.vertex_count = 0;
        self.index_count = 0;

        let baked = library.bake();
        if baked.vertices.is_empty() || baked.indices.is_empty() {
            engine_debug!("dank::GpuMeshCache", "Mesh library v{} is empty, nothing to draw", library.last_modified());
            self.synced_version = Some(library.last_modified());
            return Ok(true);
        }

        let vertex_bytes = baked.vertex_bytes();
        let vertex_buffer = device.create_buffer(BufferDesc {
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::STORAGE,
        })?;
        vertex_buffer.update(0, vertex_bytes)?;

        let index_bytes = baked.index_bytes();
        let index_buffer = device.create_buffer(BufferDesc {
            size: index_bytes.len() as u64,
            usage: BufferUsage::INDEX | BufferUsage::STORAGE,
        })?;
        index_buffer.update(0, index_bytes)?;

        self.vertex_count = baked.vertices.len() as u32;
        self.index_count = baked.indices.len() as u32;
        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.descriptors = baked.descriptors;
        self.synced_version = Some(library.last_modified());
        self.upload_count += 1;

        engine_debug!(
            "dank::GpuMeshCache",
            "Baked {} meshes: {} vertices, {} indices (library v{})",
            self.descriptors.len(),
            self.vertex_count,
            self.index_count,
            library.last_modified()
        );
        Ok(true)
    }

    /// Both blobs are uploaded and non-empty
    pub fn is_bound(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    pub fn vertex_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.index_buffer.as_ref()
    }

    pub fn descriptor(&self, id: MeshId) -> Option<&MeshDescriptor> {
        self.descriptors.get(&id)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Library version of the current buffers
    pub fn synced_version(&self) -> Option<u64> {
        self.synced_version
    }

    /// Number of rebakes uploaded so far
    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }

    /// Drop the GPU buffers; the next sync rebakes
    pub fn release(&mut self) {
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.descriptors.clear();
        self.synced_version = None;
        self.vertex_count = 0;
        self.index_count = 0;
    }
}

#[cfg(test)]
#[path = "gpu_mesh_cache_tests.rs"]
mod tests;
