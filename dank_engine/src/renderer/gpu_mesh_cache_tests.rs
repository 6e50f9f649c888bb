use super::*;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockBuffer, MockGraphicsDevice};
use crate::resource::{MeshData, Mesh, RectangleMesh, TriangleMesh, Vertex};

fn contents_u32(buffer: &Arc<dyn Buffer>) -> Vec<u32> {
    let mock = buffer.as_any().downcast_ref::<MockBuffer>().unwrap();
    bytemuck::cast_slice(&mock.contents()).to_vec()
}

struct BrokenMesh;

impl Mesh for BrokenMesh {
    fn data(&self) -> MeshData {
        MeshData {
            vertices: vec![Vertex::new([0.0; 3], [0.0; 3], [0.0; 2])],
            indices: vec![0, 4],
        }
    }
}

// ============================================================================
// SYNC
// ============================================================================

#[test]
fn test_sync_bakes_triangle_then_rectangle() {
    let mut device = MockGraphicsDevice::new();
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);
    library.add(MeshId(2), RectangleMesh);

    let mut cache = GpuMeshCache::new();
    assert!(cache.sync(&mut device, &library).unwrap());

    let indices = contents_u32(cache.index_buffer().unwrap());
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 5, 6, 3]);
    assert_eq!(cache.vertex_count(), 7);
    assert_eq!(cache.index_count(), 9);
    assert_eq!(cache.vertex_buffer().unwrap().size(), 7 * std::mem::size_of::<Vertex>() as u64);

    let rectangle = cache.descriptor(MeshId(2)).unwrap();
    assert_eq!((rectangle.vertex_offset, rectangle.index_offset), (3, 3));
    assert_eq!(rectangle.index_count, 6);
}

#[test]
fn test_sync_twice_uploads_once() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);

    let mut cache = GpuMeshCache::new();
    cache.sync(&mut device, &library).unwrap();
    let after_first = controller.stats();

    assert!(!cache.is_stale(&library));
    assert!(!cache.sync(&mut device, &library).unwrap());
    assert_eq!(controller.stats(), after_first);
    assert_eq!(cache.upload_count(), 1);
}

#[test]
fn test_mutation_triggers_rebake() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);

    let mut cache = GpuMeshCache::new();
    cache.sync(&mut device, &library).unwrap();
    let old_handle = cache.index_buffer().unwrap().handle();

    library.add(MeshId(2), RectangleMesh);
    assert!(cache.is_stale(&library));
    assert!(cache.sync(&mut device, &library).unwrap());

    assert_ne!(cache.index_buffer().unwrap().handle(), old_handle);
    assert_eq!(cache.upload_count(), 2);
    assert_eq!(cache.synced_version(), Some(library.last_modified()));
    // old buffers dropped, new ones live
    assert_eq!(controller.stats().live_buffers, 2);
}

#[test]
fn test_every_index_below_vertex_count() {
    let mut device = MockGraphicsDevice::new();
    let mut library = MeshLibrary::new();
    library.insert(RectangleMesh);
    library.insert(BrokenMesh);
    library.insert(TriangleMesh);
    library.insert(RectangleMesh);

    let mut cache = GpuMeshCache::new();
    cache.sync(&mut device, &library).unwrap();

    let indices = contents_u32(cache.index_buffer().unwrap());
    assert!(indices.iter().all(|&i| i < cache.vertex_count()));
    assert!(cache.descriptor(MeshId(2)).is_none());
}

// ============================================================================
// EMPTY AND RELEASE
// ============================================================================

#[test]
fn test_empty_library_is_unbound() {
    let mut device = MockGraphicsDevice::new();
    let library = MeshLibrary::new();

    let mut cache = GpuMeshCache::new();
    assert!(cache.sync(&mut device, &library).unwrap());
    assert!(!cache.is_bound());
    assert!(cache.vertex_buffer().is_none());
    assert_eq!(device.controller().stats().buffers_created, 0);
    assert!(!cache.sync(&mut device, &library).unwrap());
}

#[test]
fn test_clear_unbinds() {
    let mut device = MockGraphicsDevice::new();
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);

    let mut cache = GpuMeshCache::new();
    cache.sync(&mut device, &library).unwrap();
    assert!(cache.is_bound());

    library.clear();
    cache.sync(&mut device, &library).unwrap();
    assert!(!cache.is_bound());
    assert!(cache.descriptor(MeshId(1)).is_none());
}

#[test]
fn test_release_forces_rebake() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);

    let mut cache = GpuMeshCache::new();
    cache.sync(&mut device, &library).unwrap();
    cache.release();
    assert_eq!(controller.stats().live_buffers, 0);
    assert!(cache.is_stale(&library));

    cache.sync(&mut device, &library).unwrap();
    assert_eq!(cache.upload_count(), 2);
}

// ============================================================================
// FAILED UPLOADS
// ============================================================================

#[test]
fn test_failed_upload_retries_next_sync() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);

    let mut cache = GpuMeshCache::new();
    controller.fail_next_buffers(1);
    assert!(matches!(cache.sync(&mut device, &library), Err(Error::OutOfMemory)));
    assert!(!cache.is_bound());
    assert!(cache.is_stale(&library));
    assert_eq!(cache.synced_version(), None);

    assert!(cache.sync(&mut device, &library).unwrap());
    assert!(cache.is_bound());
    assert_eq!(cache.synced_version(), Some(library.last_modified()));
    assert_eq!(cache.upload_count(), 1);
}
